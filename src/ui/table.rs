use crate::scope::{NameToken, ScopeTree};
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

#[derive(Tabled)]
pub struct TokenRow {
    #[tabled(rename = "Token")]
    pub key: String,
    #[tabled(rename = "Scope")]
    pub scope: String,
    #[tabled(rename = "Reads")]
    pub reads: usize,
    #[tabled(rename = "Writes")]
    pub writes: usize,
}

/// One row per name token, in resolution order
pub fn token_table(tokens: &[NameToken], scopes: &ScopeTree) -> String {
    if tokens.is_empty() {
        return String::new();
    }

    let rows: Vec<TokenRow> = tokens
        .iter()
        .map(|token| TokenRow {
            key: token.key(),
            scope: scopes
                .get(token.scope)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| token.scope.to_string()),
            reads: token.reads().count(),
            writes: token.writes().count(),
        })
        .collect();

    Table::new(&rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CodeGraph;

    #[test]
    fn test_stats_table() {
        let table = stats_table(&[("Nodes", "12"), ("Tokens", "3")]);
        assert!(table.contains("Metric"));
        assert!(table.contains("Nodes"));
        assert!(table.contains("12"));
        assert!(stats_table(&[]).is_empty());
    }

    #[test]
    fn test_token_table() {
        let graph = CodeGraph::from_source("def f(a):\n    return a\nb = f(1)\n").unwrap();
        let table = token_table(graph.tokens(), graph.scopes());

        assert!(table.contains("stx_a_1"));
        assert!(table.contains("stx_b_0"));
        assert!(table.contains("<module>"));
    }
}
