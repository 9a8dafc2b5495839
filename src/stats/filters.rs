//! Structured filter predicates for statistics queries.
//!
//! Filter parameters become a small predicate tree rendered through
//! parameterized SQL. The rendered label doubles as the series key in query
//! results, so `label()` output is part of the API surface.

/// Which id column a predicate leaf tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    User,
    Topic,
    Board,
}

impl FilterField {
    /// Column reference inside the messages/topics join.
    fn column(self) -> &'static str {
        match self {
            Self::User => "m.uid",
            Self::Topic => "m.tid",
            Self::Board => "t.bid",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::User => "uid",
            Self::Topic => "tid",
            Self::Board => "bid",
        }
    }
}

/// A boolean filter over messages: id-equality leaves composed with OR within
/// a field and AND across fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// No restriction.
    All,
    /// One id matches.
    Eq(FilterField, i64),
    /// Any of the ids matches.
    AnyOf(FilterField, Vec<i64>),
    /// Every sub-condition holds.
    And(Vec<Condition>),
}

impl Condition {
    /// OR together a set of ids, collapsing the single-id case.
    #[must_use]
    pub fn any_of(field: FilterField, ids: Vec<i64>) -> Self {
        match ids.as_slice() {
            [id] => Self::Eq(field, *id),
            _ => Self::AnyOf(field, ids),
        }
    }

    /// Render as a SQL boolean expression with `?` placeholders, pushing the
    /// bind values in placeholder order.
    pub fn to_sql(&self, params: &mut Vec<i64>) -> String {
        match self {
            Self::All => "1".to_string(),
            Self::Eq(field, id) => {
                params.push(*id);
                format!("{} = ?", field.column())
            }
            Self::AnyOf(field, ids) => {
                let parts: Vec<String> = ids
                    .iter()
                    .map(|id| {
                        params.push(*id);
                        format!("{} = ?", field.column())
                    })
                    .collect();
                format!("({})", parts.join(" OR "))
            }
            Self::And(parts) => parts
                .iter()
                .map(|part| part.to_sql(params))
                .collect::<Vec<_>>()
                .join(" AND "),
        }
    }

    /// Human-readable rendering, used as the series key.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Eq(field, id) => format!("{}={id}", field.label()),
            Self::AnyOf(field, ids) => ids
                .iter()
                .map(|id| format!("{}={id}", field.label()))
                .collect::<Vec<_>>()
                .join(" or "),
            Self::And(parts) => parts
                .iter()
                .map(Condition::label)
                .collect::<Vec<_>>()
                .join(" and "),
        }
    }
}
