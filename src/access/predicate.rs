// src/access/predicate.rs

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

// ---
// Colunas lógicas de posse
// ---
// Cada recurso mapeia estas colunas para as expressões SQL dos aliases
// fixos que os repositórios usam (c = cases, s = court_sessions, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Office,
    RowId,
    Lawyer,
    AssistantLawyer,
    CreatedBy,
    AssignedTo,
    ClientLink,
}

/// Tradução das colunas lógicas para SQL de um recurso.
/// `None` significa que o recurso não tem essa coluna (renderiza FALSE).
#[derive(Debug, Clone, Copy)]
pub struct ColumnMap {
    pub office: &'static str,
    pub active: &'static str,
    pub row_id: &'static str,
    pub lawyer: Option<&'static str>,
    pub assistant_lawyer: Option<&'static str>,
    pub created_by: Option<&'static str>,
    pub assigned_to: Option<&'static str>,
    pub client_link: Option<&'static str>,
}

impl ColumnMap {
    pub fn sql(&self, column: Column) -> Option<&'static str> {
        match column {
            Column::Office => Some(self.office),
            Column::RowId => Some(self.row_id),
            Column::Lawyer => self.lawyer,
            Column::AssistantLawyer => self.assistant_lawyer,
            Column::CreatedBy => self.created_by,
            Column::AssignedTo => self.assigned_to,
            Column::ClientLink => self.client_link,
        }
    }
}

/// As colunas de posse de UMA linha já buscada do banco.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipRow {
    pub row_id: Uuid,
    pub office_id: Uuid,
    pub is_active: bool,
    pub lawyer_id: Option<Uuid>,
    pub assistant_lawyer_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

impl OwnershipRow {
    fn value(&self, column: Column) -> Option<Uuid> {
        match column {
            Column::Office => Some(self.office_id),
            Column::RowId => Some(self.row_id),
            Column::Lawyer => self.lawyer_id,
            Column::AssistantLawyer => self.assistant_lawyer_id,
            Column::CreatedBy => self.created_by,
            Column::AssignedTo => self.assigned_to,
            Column::ClientLink => self.client_id,
        }
    }
}

// ---
// A AST do predicado
// ---
// O mesmo valor é renderizado como SQL (listagens) e avaliado contra uma
// linha (authorize). As duas visões nunca divergem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Eq(Column, Uuid),
    Or(Vec<Predicate>),
    And(Vec<Predicate>),
    Active,
    Never,
}

impl Predicate {
    pub fn any_of(column_ids: &[Column], id: Uuid) -> Self {
        Predicate::Or(column_ids.iter().map(|c| Predicate::Eq(*c, id)).collect())
    }

    pub fn matches(&self, row: &OwnershipRow) -> bool {
        match self {
            Predicate::Eq(column, id) => row.value(*column) == Some(*id),
            Predicate::Or(parts) => parts.iter().any(|p| p.matches(row)),
            Predicate::And(parts) => parts.iter().all(|p| p.matches(row)),
            Predicate::Active => row.is_active,
            Predicate::Never => false,
        }
    }

    /// Escreve o predicado no QueryBuilder, com os UUIDs como parâmetros.
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>, map: &ColumnMap) {
        match self {
            Predicate::Eq(column, id) => match map.sql(*column) {
                Some(sql) => {
                    qb.push(sql).push(" = ").push_bind(*id);
                }
                None => {
                    qb.push("FALSE");
                }
            },
            Predicate::Or(parts) => push_joined(qb, map, parts, " OR ", "FALSE"),
            Predicate::And(parts) => push_joined(qb, map, parts, " AND ", "TRUE"),
            Predicate::Active => {
                qb.push(map.active).push(" = TRUE");
            }
            Predicate::Never => {
                qb.push("FALSE");
            }
        }
    }
}

fn push_joined(
    qb: &mut QueryBuilder<'_, Postgres>,
    map: &ColumnMap,
    parts: &[Predicate],
    separator: &str,
    empty: &str,
) {
    if parts.is_empty() {
        qb.push(empty);
        return;
    }
    qb.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        part.push_sql(qb, map);
    }
    qb.push(")");
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: ColumnMap = ColumnMap {
        office: "c.office_id",
        active: "c.is_active",
        row_id: "c.id",
        lawyer: Some("c.lawyer_id"),
        assistant_lawyer: Some("c.assistant_lawyer_id"),
        created_by: Some("c.created_by"),
        assigned_to: None,
        client_link: Some("c.client_id"),
    };

    #[test]
    fn renders_nested_predicate_with_placeholders() {
        let office = Uuid::new_v4();
        let me = Uuid::new_v4();
        let predicate = Predicate::And(vec![
            Predicate::Eq(Column::Office, office),
            Predicate::any_of(&[Column::Lawyer, Column::AssistantLawyer], me),
            Predicate::Active,
        ]);

        let mut qb = QueryBuilder::<Postgres>::new("SELECT c.* FROM cases c WHERE ");
        predicate.push_sql(&mut qb, &MAP);

        assert_eq!(
            qb.sql(),
            "SELECT c.* FROM cases c WHERE (c.office_id = $1 AND (c.lawyer_id = $2 OR c.assistant_lawyer_id = $3) AND c.is_active = TRUE)"
        );
    }

    #[test]
    fn missing_column_renders_false() {
        let mut qb = QueryBuilder::<Postgres>::new("");
        Predicate::Eq(Column::AssignedTo, Uuid::new_v4()).push_sql(&mut qb, &MAP);
        assert_eq!(qb.sql(), "FALSE");
    }

    #[test]
    fn empty_groups_fail_closed_for_or() {
        let row = OwnershipRow::default();
        assert!(!Predicate::Or(vec![]).matches(&row));
        assert!(Predicate::And(vec![]).matches(&row));
        assert!(!Predicate::Never.matches(&row));
    }

    #[test]
    fn eq_on_absent_value_never_matches() {
        let me = Uuid::new_v4();
        let row = OwnershipRow {
            lawyer_id: None,
            ..Default::default()
        };
        assert!(!Predicate::Eq(Column::Lawyer, me).matches(&row));
    }
}
