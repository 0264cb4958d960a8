use chrono::NaiveDate;
use sqlx::mysql::MySqlArguments;
use sqlx::query::QueryAs;
use sqlx::MySql;

/// ===============================
/// SQL bindable filter value enum
/// ===============================
/// Typed values collected while building a dynamic WHERE clause, bound
/// onto the query in one pass afterwards.
#[derive(Debug, Clone)]
pub enum FilterValue {
    U64(u64),
    I64(i64),
    Str(String),
    Date(NaiveDate),
}

impl FilterValue {
    pub fn bind_as<'q, O>(
        self,
        query: QueryAs<'q, MySql, O, MySqlArguments>,
    ) -> QueryAs<'q, MySql, O, MySqlArguments> {
        match self {
            FilterValue::U64(v) => query.bind(v),
            FilterValue::I64(v) => query.bind(v),
            FilterValue::Str(v) => query.bind(v),
            FilterValue::Date(v) => query.bind(v),
        }
    }
}
