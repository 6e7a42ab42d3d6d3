// src/access/mod.rs

//! Controle de acesso e isolamento por escritório.
//!
//! Um único ponto de decisão para todos os recursos: `authorize` para
//! operações numa linha já buscada e `scope_filter` para listagens. Os dois
//! partem da mesma tabela de políticas (`policy`), então a contagem de uma
//! página e o acesso a uma linha individual sempre concordam.

pub mod policy;
pub mod predicate;

use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

pub use predicate::{Column, ColumnMap, OwnershipRow, Predicate};

// ---
// Papéis (conjunto fechado, mapeia o enum `user_role` do Postgres)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Lawyer,
    Assistant,
    Trainee,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Case,
    Client,
    CourtSession,
    Document,
    Invoice,
    Task,
    User,
}

impl ResourceType {
    /// Nome usado em `activities.entity_type` e `notifications.related_entity_type`.
    pub fn entity_name(self) -> &'static str {
        match self {
            ResourceType::Case => "case",
            ResourceType::Client => "client",
            ResourceType::CourtSession => "session",
            ResourceType::Document => "document",
            ResourceType::Invoice => "invoice",
            ResourceType::Task => "task",
            ResourceType::User => "user",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    fn is_mutation(self) -> bool {
        matches!(self, Action::Update | Action::Delete)
    }
}

/// A identidade da sessão: já autenticada, vinda do middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
    pub office_id: Uuid,
    pub client_id: Option<Uuid>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Motivos de negação. O handler decide como expor (404 x 403).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("linha pertence a outro escritório")]
    CrossTenant,
    #[error("linha não pertence ao usuário")]
    NotOwner,
    #[error("papel sem permissão para a ação")]
    RoleForbidden,
    #[error("usuário cliente sem vínculo com um cliente")]
    MissingClientLink,
    #[error("linha desativada")]
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    ActiveOnly,
    /// Só vale para admin; para os outros papéis é ignorado.
    IncludeInactive,
}

impl Visibility {
    pub fn from_flag(include_inactive: bool) -> Self {
        if include_inactive {
            Visibility::IncludeInactive
        } else {
            Visibility::ActiveOnly
        }
    }
}

/// Fragmento WHERE de uma listagem. A cláusula do escritório está sempre presente.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    resource: ResourceType,
    predicate: Predicate,
}

impl ScopeFilter {
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        self.predicate.push_sql(qb, policy::columns(self.resource));
    }

    pub fn matches(&self, row: &OwnershipRow) -> bool {
        self.predicate.matches(row)
    }
}

// =============================================================================
//  AS OPERAÇÕES DO MOTOR
// =============================================================================

pub fn authorize(
    principal: &Principal,
    resource: ResourceType,
    action: Action,
    row: &OwnershipRow,
) -> Result<(), Denial> {
    if !policy::capability(principal.role, resource, action) {
        return Err(Denial::RoleForbidden);
    }

    // Falha fechada antes de olhar a linha.
    let clause = policy::role_clause(principal, resource)?;

    if row.office_id != principal.office_id {
        return Err(Denial::CrossTenant);
    }

    if !row.is_active && (action.is_mutation() || !principal.is_admin()) {
        return Err(Denial::Inactive);
    }

    match clause {
        None => Ok(()),
        Some(predicate) if predicate.matches(row) => Ok(()),
        Some(_) => Err(Denial::NotOwner),
    }
}

pub fn scope_filter(
    principal: &Principal,
    resource: ResourceType,
    visibility: Visibility,
) -> Result<ScopeFilter, Denial> {
    if !policy::capability(principal.role, resource, Action::List) {
        return Err(Denial::RoleForbidden);
    }

    let mut parts = vec![Predicate::Eq(Column::Office, principal.office_id)];

    if let Some(clause) = policy::role_clause(principal, resource)? {
        parts.push(clause);
    }

    let include_inactive = principal.is_admin() && visibility == Visibility::IncludeInactive;
    if !include_inactive {
        parts.push(Predicate::Active);
    }

    Ok(ScopeFilter {
        resource,
        predicate: Predicate::And(parts),
    })
}

/// O escritório de uma linha nova vem SEMPRE da sessão.
pub fn tenant_for_create(principal: &Principal, supplied: Option<Uuid>) -> Uuid {
    if let Some(other) = supplied.filter(|id| *id != principal.office_id) {
        tracing::debug!(
            user_id = %principal.user_id,
            supplied = %other,
            "officeId informado pelo cliente ignorado"
        );
    }
    principal.office_id
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_RESOURCES: [ResourceType; 7] = [
        ResourceType::Case,
        ResourceType::Client,
        ResourceType::CourtSession,
        ResourceType::Document,
        ResourceType::Invoice,
        ResourceType::Task,
        ResourceType::User,
    ];

    fn principal(role: Role, office_id: Uuid) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            role,
            office_id,
            client_id: None,
        }
    }

    fn case_row(office_id: Uuid, lawyer: Uuid, assistant: Option<Uuid>) -> OwnershipRow {
        OwnershipRow {
            row_id: Uuid::new_v4(),
            office_id,
            is_active: true,
            lawyer_id: Some(lawyer),
            assistant_lawyer_id: assistant,
            created_by: Some(lawyer),
            assigned_to: None,
            client_id: Some(Uuid::new_v4()),
        }
    }

    fn visible(p: &Principal, resource: ResourceType, rows: &[OwnershipRow]) -> Vec<Uuid> {
        let scope = scope_filter(p, resource, Visibility::ActiveOnly).unwrap();
        rows.iter().filter(|r| scope.matches(r)).map(|r| r.row_id).collect()
    }

    #[test]
    fn lawyer_sees_only_own_and_assisted_cases() {
        let office = Uuid::new_v4();
        let lawyer = principal(Role::Lawyer, office);
        let someone = Uuid::new_v4();

        let c1 = case_row(office, lawyer.user_id, None);
        let c2 = case_row(office, someone, Some(lawyer.user_id));
        let c3 = case_row(office, someone, None);
        let rows = vec![c1.clone(), c2.clone(), c3.clone()];

        assert_eq!(visible(&lawyer, ResourceType::Case, &rows), vec![c1.row_id, c2.row_id]);
        assert_eq!(authorize(&lawyer, ResourceType::Case, Action::Read, &c3), Err(Denial::NotOwner));
        assert!(authorize(&lawyer, ResourceType::Case, Action::Update, &c2).is_ok());
    }

    #[test]
    fn no_role_crosses_offices() {
        let office_a = Uuid::new_v4();
        let office_b = Uuid::new_v4();

        for role in [Role::Admin, Role::Lawyer, Role::Assistant, Role::Trainee, Role::Client] {
            let mut p = principal(role, office_a);
            p.client_id = Some(Uuid::new_v4());

            // Linha de B em que o usuário aparece em TODAS as colunas de posse.
            let row = OwnershipRow {
                row_id: p.user_id,
                office_id: office_b,
                is_active: true,
                lawyer_id: Some(p.user_id),
                assistant_lawyer_id: Some(p.user_id),
                created_by: Some(p.user_id),
                assigned_to: Some(p.user_id),
                client_id: p.client_id,
            };

            for resource in ALL_RESOURCES {
                if let Ok(scope) = scope_filter(&p, resource, Visibility::IncludeInactive) {
                    assert!(!scope.matches(&row), "{role:?} listou {resource:?} de outro escritório");
                }
                let result = authorize(&p, resource, Action::Read, &row);
                assert!(
                    matches!(result, Err(Denial::CrossTenant) | Err(Denial::RoleForbidden)),
                    "{role:?} leu {resource:?} de outro escritório: {result:?}"
                );
            }
        }
    }

    #[test]
    fn client_role_without_link_is_denied_everywhere() {
        let office = Uuid::new_v4();
        let p = principal(Role::Client, office);
        let row = case_row(office, Uuid::new_v4(), None);

        for resource in ALL_RESOURCES {
            assert!(scope_filter(&p, resource, Visibility::ActiveOnly).is_err());
            for action in [Action::List, Action::Read, Action::Create, Action::Update, Action::Delete] {
                assert!(authorize(&p, resource, action, &row).is_err());
            }
        }
    }

    #[test]
    fn client_role_sees_cases_of_its_client() {
        let office = Uuid::new_v4();
        let mut p = principal(Role::Client, office);
        let mine = case_row(office, Uuid::new_v4(), None);
        p.client_id = mine.client_id;
        let other = case_row(office, Uuid::new_v4(), None);

        assert!(authorize(&p, ResourceType::Case, Action::Read, &mine).is_ok());
        assert_eq!(authorize(&p, ResourceType::Case, Action::Read, &other), Err(Denial::NotOwner));
        assert_eq!(
            authorize(&p, ResourceType::Case, Action::Update, &mine),
            Err(Denial::RoleForbidden)
        );
    }

    #[test]
    fn admin_sees_whole_office_but_nothing_else() {
        let office_a = Uuid::new_v4();
        let admin = principal(Role::Admin, office_a);
        let rows: Vec<OwnershipRow> = (0..5)
            .map(|i| {
                let office = if i % 2 == 0 { office_a } else { Uuid::new_v4() };
                case_row(office, Uuid::new_v4(), None)
            })
            .collect();

        for resource in [ResourceType::Case, ResourceType::Client, ResourceType::CourtSession, ResourceType::Document] {
            let seen = visible(&admin, resource, &rows);
            let expected: Vec<Uuid> = rows.iter().filter(|r| r.office_id == office_a).map(|r| r.row_id).collect();
            assert_eq!(seen, expected);
        }
    }

    #[test]
    fn trainee_is_narrower_and_never_sees_finance() {
        let office = Uuid::new_v4();
        let trainee = principal(Role::Trainee, office);

        let lead = case_row(office, trainee.user_id, None);
        let assisting = case_row(office, Uuid::new_v4(), Some(trainee.user_id));
        let rows = vec![lead.clone(), assisting.clone()];
        assert_eq!(visible(&trainee, ResourceType::Case, &rows), vec![assisting.row_id]);

        let invoice = OwnershipRow {
            created_by: Some(trainee.user_id),
            ..assisting.clone()
        };
        assert_eq!(
            scope_filter(&trainee, ResourceType::Invoice, Visibility::ActiveOnly).unwrap_err(),
            Denial::RoleForbidden
        );
        assert_eq!(
            authorize(&trainee, ResourceType::Invoice, Action::Read, &invoice),
            Err(Denial::RoleForbidden)
        );
    }

    #[test]
    fn trainee_tasks_follow_assignment() {
        let office = Uuid::new_v4();
        let trainee = principal(Role::Trainee, office);
        let task = OwnershipRow {
            row_id: Uuid::new_v4(),
            office_id: office,
            is_active: true,
            assigned_to: Some(trainee.user_id),
            created_by: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(authorize(&trainee, ResourceType::Task, Action::Update, &task).is_ok());
        assert_eq!(
            authorize(&trainee, ResourceType::Task, Action::Delete, &task),
            Err(Denial::RoleForbidden)
        );
    }

    #[test]
    fn inactive_rows_are_hidden_from_default_lists() {
        let office = Uuid::new_v4();
        let admin = principal(Role::Admin, office);
        let lawyer = principal(Role::Lawyer, office);

        let mut gone = case_row(office, lawyer.user_id, None);
        gone.is_active = false;
        let rows = vec![gone.clone()];

        assert!(visible(&admin, ResourceType::Case, &rows).is_empty());
        assert!(visible(&lawyer, ResourceType::Case, &rows).is_empty());

        let with_history = scope_filter(&admin, ResourceType::Case, Visibility::IncludeInactive).unwrap();
        assert!(with_history.matches(&gone));

        // Não-admin não consegue pedir inativos.
        let lawyer_history = scope_filter(&lawyer, ResourceType::Case, Visibility::IncludeInactive).unwrap();
        assert!(!lawyer_history.matches(&gone));

        assert_eq!(authorize(&admin, ResourceType::Case, Action::Update, &gone), Err(Denial::Inactive));
        assert_eq!(authorize(&admin, ResourceType::Case, Action::Delete, &gone), Err(Denial::Inactive));
        assert!(authorize(&admin, ResourceType::Case, Action::Read, &gone).is_ok());
        assert_eq!(authorize(&lawyer, ResourceType::Case, Action::Read, &gone), Err(Denial::Inactive));
    }

    #[test]
    fn list_scope_and_single_row_authorize_agree() {
        let office = Uuid::new_v4();
        let users: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let client = Uuid::new_v4();

        let mut rows = Vec::new();
        for lawyer in &users {
            for assistant in [None, Some(users[0]), Some(users[2])] {
                for active in [true, false] {
                    rows.push(OwnershipRow {
                        row_id: Uuid::new_v4(),
                        office_id: office,
                        is_active: active,
                        lawyer_id: Some(*lawyer),
                        assistant_lawyer_id: assistant,
                        created_by: Some(*lawyer),
                        assigned_to: assistant,
                        client_id: Some(client),
                    });
                }
            }
        }

        for role in [Role::Admin, Role::Lawyer, Role::Assistant, Role::Trainee, Role::Client] {
            let p = Principal {
                user_id: users[0],
                role,
                office_id: office,
                client_id: Some(client),
            };
            for resource in ALL_RESOURCES {
                let Ok(scope) = scope_filter(&p, resource, Visibility::ActiveOnly) else {
                    continue;
                };
                for row in &rows {
                    let listed = scope.matches(row);
                    let readable = authorize(&p, resource, Action::Read, row).is_ok();
                    if listed {
                        assert!(readable, "{role:?}/{resource:?}: listado mas não legível");
                    }
                    if readable && row.is_active {
                        assert!(listed, "{role:?}/{resource:?}: legível mas fora da lista");
                    }
                }
            }
        }
    }

    #[test]
    fn create_path_ignores_supplied_office() {
        let office = Uuid::new_v4();
        let p = principal(Role::Lawyer, office);
        assert_eq!(tenant_for_create(&p, Some(Uuid::new_v4())), office);
        assert_eq!(tenant_for_create(&p, None), office);
    }

    #[test]
    fn lawyer_list_sql_always_carries_office_clause() {
        let office = Uuid::new_v4();
        let lawyer = principal(Role::Lawyer, office);
        let scope = scope_filter(&lawyer, ResourceType::CourtSession, Visibility::ActiveOnly).unwrap();

        let mut qb = QueryBuilder::<Postgres>::new("SELECT s.id FROM court_sessions s JOIN cases c ON c.id = s.case_id WHERE ");
        scope.push_where(&mut qb);

        assert!(qb.sql().contains("s.office_id = $1"));
        assert!(qb.sql().contains("c.lawyer_id = $2 OR c.assistant_lawyer_id = $3"));
        assert!(qb.sql().ends_with("s.is_active = TRUE)"));
    }

    #[test]
    fn admin_list_sql_has_no_role_clause() {
        let admin = principal(Role::Admin, Uuid::new_v4());
        let scope = scope_filter(&admin, ResourceType::Case, Visibility::ActiveOnly).unwrap();
        assert_eq!(
            scope.predicate(),
            &Predicate::And(vec![Predicate::Eq(Column::Office, admin.office_id), Predicate::Active])
        );
    }
}
