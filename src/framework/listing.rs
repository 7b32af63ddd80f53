// Listing helpers - `ordering=` and `search=` query parameters turned into SQL

use sqlx::{QueryBuilder, Sqlite};

/// Sortable columns of a collection and its default order.
///
/// Only names listed in `fields` ever reach the SQL text, so the generated
/// clause is safe to interpolate.
#[derive(Debug, Clone, Copy)]
pub struct OrderingFields {
    pub fields: &'static [&'static str],
    pub default: &'static [&'static str],
}

impl OrderingFields {
    pub const fn new(fields: &'static [&'static str], default: &'static [&'static str]) -> Self {
        Self { fields, default }
    }

    /// Parses a comma-separated `ordering` value (`-` prefix for descending).
    /// Unknown fields are ignored; if nothing valid remains the default applies.
    pub fn resolve(&self, raw: Option<&str>) -> Vec<OrderTerm> {
        let requested: Vec<OrderTerm> = raw
            .unwrap_or_default()
            .split(',')
            .filter_map(|term| self.parse_term(term.trim()))
            .collect();

        if requested.is_empty() {
            self.default
                .iter()
                .filter_map(|term| self.parse_term(term))
                .collect()
        } else {
            requested
        }
    }

    /// `ORDER BY` body for the given table alias, with `id` as the final tiebreaker.
    pub fn order_by_clause(&self, raw: Option<&str>, alias: &str) -> String {
        let terms = self.resolve(raw);
        let tiebreak = match terms.first() {
            Some(term) if term.descending => "DESC",
            _ => "ASC",
        };

        let mut parts: Vec<String> = terms
            .iter()
            .map(|term| {
                format!(
                    "{}.{} {}",
                    alias,
                    term.field,
                    if term.descending { "DESC" } else { "ASC" }
                )
            })
            .collect();
        parts.push(format!("{}.id {}", alias, tiebreak));
        parts.join(", ")
    }

    fn parse_term(&self, term: &str) -> Option<OrderTerm> {
        let (name, descending) = match term.strip_prefix('-') {
            Some(name) => (name, true),
            None => (term, false),
        };
        self.fields
            .iter()
            .copied()
            .find(|allowed| *allowed == name)
            .map(|field| OrderTerm { field, descending })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm {
    pub field: &'static str,
    pub descending: bool,
}

/// Splits a `search` value into terms; every term has to match.
pub fn search_terms(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// Appends `AND (col LIKE ? OR ...)` for each term. SQLite's LIKE is
/// case-insensitive for ASCII, which gives icontains semantics.
pub fn push_search(qb: &mut QueryBuilder<'_, Sqlite>, terms: &[String], columns: &[&str]) {
    for term in terms {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(*column);
            qb.push(" LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\'");
        }
        qb.push(")");
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST_ORDERING: OrderingFields = OrderingFields::new(
        &["created_at", "updated_at", "published_at", "view_count"],
        &["-created_at"],
    );

    #[test]
    fn test_default_ordering() {
        assert_eq!(
            POST_ORDERING.order_by_clause(None, "p"),
            "p.created_at DESC, p.id DESC"
        );
    }

    #[test]
    fn test_requested_ordering_ignores_unknown_fields() {
        assert_eq!(
            POST_ORDERING.order_by_clause(Some("view_count,-bogus; DROP TABLE posts"), "p"),
            "p.view_count ASC, p.id ASC"
        );
        assert_eq!(
            POST_ORDERING.order_by_clause(Some("-view_count, published_at"), "p"),
            "p.view_count DESC, p.published_at ASC, p.id DESC"
        );
        assert_eq!(
            POST_ORDERING.order_by_clause(Some("title"), "p"),
            "p.created_at DESC, p.id DESC"
        );
    }

    #[test]
    fn test_search_terms_split() {
        assert_eq!(search_terms(Some("  rust  async,tokio ")), vec!["rust", "async", "tokio"]);
        assert!(search_terms(None).is_empty());
    }

    #[test]
    fn test_like_escaping() {
        assert_eq!(escape_like("100%_off\\"), "100\\%\\_off\\\\");
    }

    #[test]
    fn test_push_search_shape() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM tags WHERE 1 = 1");
        push_search(&mut qb, &["rust".to_string()], &["name"]);
        assert_eq!(
            qb.sql(),
            "SELECT id FROM tags WHERE 1 = 1 AND (name LIKE ? ESCAPE '\\')"
        );
    }
}
