// src/access/policy.rs

use uuid::Uuid;

use super::predicate::{Column, ColumnMap, Predicate};
use super::{Action, Denial, Principal, ResourceType, Role};

// =============================================================================
//  MAPAS DE COLUNAS (aliases fixos dos repositórios)
// =============================================================================

pub const CASE_COLUMNS: ColumnMap = ColumnMap {
    office: "c.office_id",
    active: "c.is_active",
    row_id: "c.id",
    lawyer: Some("c.lawyer_id"),
    assistant_lawyer: Some("c.assistant_lawyer_id"),
    created_by: Some("c.created_by"),
    assigned_to: None,
    client_link: Some("c.client_id"),
};

pub const CLIENT_COLUMNS: ColumnMap = ColumnMap {
    office: "cl.office_id",
    active: "cl.is_active",
    row_id: "cl.id",
    lawyer: None,
    assistant_lawyer: None,
    created_by: Some("cl.created_by"),
    assigned_to: None,
    client_link: Some("cl.id"),
};

// Sessões herdam a posse do processo (JOIN cases c).
pub const COURT_SESSION_COLUMNS: ColumnMap = ColumnMap {
    office: "s.office_id",
    active: "s.is_active",
    row_id: "s.id",
    lawyer: Some("c.lawyer_id"),
    assistant_lawyer: Some("c.assistant_lawyer_id"),
    created_by: Some("s.created_by"),
    assigned_to: None,
    client_link: Some("c.client_id"),
};

pub const DOCUMENT_COLUMNS: ColumnMap = ColumnMap {
    office: "d.office_id",
    active: "d.is_active",
    row_id: "d.id",
    lawyer: Some("c.lawyer_id"),
    assistant_lawyer: Some("c.assistant_lawyer_id"),
    created_by: Some("d.uploaded_by"),
    assigned_to: None,
    client_link: Some("c.client_id"),
};

// Faturas: LEFT JOIN cases c (o processo é opcional).
pub const INVOICE_COLUMNS: ColumnMap = ColumnMap {
    office: "i.office_id",
    active: "i.is_active",
    row_id: "i.id",
    lawyer: Some("c.lawyer_id"),
    assistant_lawyer: Some("c.assistant_lawyer_id"),
    created_by: Some("i.created_by"),
    assigned_to: None,
    client_link: Some("i.client_id"),
};

// Tarefas: LEFT JOIN cases c.
pub const TASK_COLUMNS: ColumnMap = ColumnMap {
    office: "t.office_id",
    active: "t.is_active",
    row_id: "t.id",
    lawyer: Some("c.lawyer_id"),
    assistant_lawyer: Some("c.assistant_lawyer_id"),
    created_by: Some("t.created_by"),
    assigned_to: Some("t.assigned_to"),
    client_link: Some("c.client_id"),
};

pub const USER_COLUMNS: ColumnMap = ColumnMap {
    office: "u.office_id",
    active: "u.is_active",
    row_id: "u.id",
    lawyer: None,
    assistant_lawyer: None,
    created_by: None,
    assigned_to: None,
    client_link: None,
};

pub fn columns(resource: ResourceType) -> &'static ColumnMap {
    match resource {
        ResourceType::Case => &CASE_COLUMNS,
        ResourceType::Client => &CLIENT_COLUMNS,
        ResourceType::CourtSession => &COURT_SESSION_COLUMNS,
        ResourceType::Document => &DOCUMENT_COLUMNS,
        ResourceType::Invoice => &INVOICE_COLUMNS,
        ResourceType::Task => &TASK_COLUMNS,
        ResourceType::User => &USER_COLUMNS,
    }
}

// =============================================================================
//  CAPACIDADES (role, recurso) -> ações
// =============================================================================

pub fn capability(role: Role, resource: ResourceType, action: Action) -> bool {
    use Action::*;
    use ResourceType::*;

    match role {
        Role::Admin => true,
        Role::Lawyer | Role::Assistant => match resource {
            User => matches!(action, List | Read | Update),
            _ => true,
        },
        Role::Trainee => match resource {
            Invoice => false,
            CourtSession | Document | Task => !matches!(action, Delete),
            Case | Client => matches!(action, List | Read),
            User => matches!(action, List | Read | Update),
        },
        Role::Client => match resource {
            Task => false,
            _ => matches!(action, List | Read),
        },
    }
}

// =============================================================================
//  A TABELA DE POLÍTICAS (role, recurso) -> predicado de posse
// =============================================================================

/// Cláusula de posse do papel. Admin não tem cláusula (só a do escritório).
/// Erro = negação incondicional (ex: cliente sem vínculo).
pub fn role_clause(principal: &Principal, resource: ResourceType) -> Result<Option<Predicate>, Denial> {
    let me = principal.user_id;

    let clause = match principal.role {
        Role::Admin => return Ok(None),
        Role::Lawyer | Role::Assistant => staff_clause(resource, me),
        Role::Trainee => trainee_clause(resource, me),
        Role::Client => {
            let client_id = principal.client_id.ok_or(Denial::MissingClientLink)?;
            client_clause(resource, me, client_id)
        }
    };

    Ok(Some(clause))
}

fn staff_clause(resource: ResourceType, me: Uuid) -> Predicate {
    match resource {
        ResourceType::Case | ResourceType::CourtSession | ResourceType::Document => {
            Predicate::any_of(&[Column::Lawyer, Column::AssistantLawyer], me)
        }
        ResourceType::Client => Predicate::Eq(Column::CreatedBy, me),
        ResourceType::Invoice => {
            Predicate::any_of(&[Column::Lawyer, Column::AssistantLawyer, Column::CreatedBy], me)
        }
        ResourceType::Task => Predicate::any_of(
            &[Column::AssignedTo, Column::CreatedBy, Column::Lawyer, Column::AssistantLawyer],
            me,
        ),
        ResourceType::User => Predicate::Eq(Column::RowId, me),
    }
}

fn trainee_clause(resource: ResourceType, me: Uuid) -> Predicate {
    match resource {
        ResourceType::Case | ResourceType::CourtSession | ResourceType::Document => {
            Predicate::Eq(Column::AssistantLawyer, me)
        }
        ResourceType::Task => Predicate::Eq(Column::AssignedTo, me),
        ResourceType::Client => Predicate::Eq(Column::CreatedBy, me),
        // Financeiro: sempre negado, mesmo com atribuição.
        ResourceType::Invoice => Predicate::Never,
        ResourceType::User => Predicate::Eq(Column::RowId, me),
    }
}

fn client_clause(resource: ResourceType, me: Uuid, client_id: Uuid) -> Predicate {
    match resource {
        ResourceType::Case
        | ResourceType::CourtSession
        | ResourceType::Document
        | ResourceType::Invoice
        | ResourceType::Client => Predicate::Eq(Column::ClientLink, client_id),
        ResourceType::Task => Predicate::Never,
        ResourceType::User => Predicate::Eq(Column::RowId, me),
    }
}
