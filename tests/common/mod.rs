// Banco real para os testes de concorrência e do SQL da varredura.
// Sem MIZAN_TEST_DATABASE_URL os testes que dependem dele são pulados.

use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use mizan::access::{Principal, Role};

pub const DATABASE_ENV: &str = "MIZAN_TEST_DATABASE_URL";

pub async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var(DATABASE_ENV) else {
        eprintln!("{} ausente: teste de banco pulado", DATABASE_ENV);
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("falha ao conectar no banco de teste");
    sqlx::migrate!().run(&pool).await.expect("falha ao rodar as migrações");
    Some(pool)
}

/// Um escritório isolado: dois admins, um advogado, um cliente e um processo.
pub struct OfficeFixture {
    pub office_id: Uuid,
    pub admin_id: Uuid,
    pub second_admin_id: Uuid,
    pub lawyer_id: Uuid,
    pub client_id: Uuid,
    pub case_id: Uuid,
}

impl OfficeFixture {
    pub fn principal(&self, user_id: Uuid, role: Role) -> Principal {
        Principal {
            user_id,
            role,
            office_id: self.office_id,
            client_id: None,
        }
    }

    pub fn admin(&self) -> Principal {
        self.principal(self.admin_id, Role::Admin)
    }
}

async fn insert_user(pool: &PgPool, office_id: Uuid, role: Role, name: &str) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO users (office_id, email, password_hash, full_name, role)
        VALUES ($1, $2, 'x', $3, $4)
        RETURNING id
        "#,
    )
    .bind(office_id)
    .bind(format!("{}@mizan.test", Uuid::new_v4()))
    .bind(name)
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("falha ao criar usuário")
}

pub async fn seed_office(pool: &PgPool) -> OfficeFixture {
    let office_id: Uuid = sqlx::query_scalar("INSERT INTO offices (name) VALUES ('مكتب الاختبار') RETURNING id")
        .fetch_one(pool)
        .await
        .expect("falha ao criar escritório");

    let admin_id = insert_user(pool, office_id, Role::Admin, "مدير أول").await;
    let second_admin_id = insert_user(pool, office_id, Role::Admin, "مدير ثان").await;
    let lawyer_id = insert_user(pool, office_id, Role::Lawyer, "محامي").await;

    let client_id: Uuid = sqlx::query_scalar(
        "INSERT INTO clients (office_id, full_name, created_by) VALUES ($1, 'موكل', $2) RETURNING id",
    )
    .bind(office_id)
    .bind(admin_id)
    .fetch_one(pool)
    .await
    .expect("falha ao criar cliente");

    let case_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO cases (office_id, case_number, title, client_id, lawyer_id, created_by)
        VALUES ($1, 'CASE-001', 'قضية اختبار', $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(office_id)
    .bind(client_id)
    .bind(lawyer_id)
    .bind(admin_id)
    .fetch_one(pool)
    .await
    .expect("falha ao criar processo");

    OfficeFixture {
        office_id,
        admin_id,
        second_admin_id,
        lawyer_id,
        client_id,
        case_id,
    }
}

pub async fn insert_invoice(pool: &PgPool, fx: &OfficeFixture, amount: Decimal) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO invoices (office_id, invoice_number, client_id, case_id, amount, created_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(fx.office_id)
    .bind(format!("INV-{}", Uuid::new_v4()))
    .bind(fx.client_id)
    .bind(fx.case_id)
    .bind(amount)
    .bind(fx.admin_id)
    .fetch_one(pool)
    .await
    .expect("falha ao criar fatura")
}
