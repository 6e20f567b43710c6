//! In-memory tables served by the `db-query` tool

use rust_mcp_sdk::macros;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, macros::JsonSchema)]
pub enum Table {
    #[serde(rename = "users")]
    Users,
    #[serde(rename = "products")]
    Products,
    #[serde(rename = "orders")]
    Orders,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Products => "products",
            Self::Orders => "orders",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, macros::JsonSchema)]
pub enum QueryAction {
    #[serde(rename = "list")]
    List,
    #[serde(rename = "count")]
    Count,
    #[serde(rename = "find")]
    Find,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: u32,
    pub name: &'static str,
    pub email: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: u32,
    pub name: &'static str,
    pub price: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: u32,
    pub user_id: u32,
    pub product_id: u32,
    pub status: &'static str,
}

pub const USERS: [User; 2] = [
    User {
        id: 1,
        name: "Alice",
        email: "alice@example.com",
    },
    User {
        id: 2,
        name: "Bob",
        email: "bob@example.com",
    },
];

pub const PRODUCTS: [Product; 2] = [
    Product {
        id: 1,
        name: "Laptop",
        price: 999,
    },
    Product {
        id: 2,
        name: "Phone",
        price: 599,
    },
];

pub const ORDERS: [Order; 2] = [
    Order {
        id: 1,
        user_id: 1,
        product_id: 1,
        status: "completed",
    },
    Order {
        id: 2,
        user_id: 2,
        product_id: 2,
        status: "pending",
    },
];

/// Field values rendered as text, used by substring search.
pub trait Record {
    fn field_values(&self) -> Vec<String>;

    fn matches(&self, needle_lowercase: &str) -> bool {
        self.field_values()
            .iter()
            .any(|value| value.to_lowercase().contains(needle_lowercase))
    }
}

impl Record for User {
    fn field_values(&self) -> Vec<String> {
        vec![self.id.to_string(), self.name.to_string(), self.email.to_string()]
    }
}

impl Record for Product {
    fn field_values(&self) -> Vec<String> {
        vec![self.id.to_string(), self.name.to_string(), self.price.to_string()]
    }
}

impl Record for Order {
    fn field_values(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.user_id.to_string(),
            self.product_id.to_string(),
            self.status.to_string(),
        ]
    }
}

/// Rows of `rows` containing `filter` in any field, ignoring case.
pub fn find_rows<'a, R: Record>(rows: &'a [R], filter: &str) -> Vec<&'a R> {
    let needle = filter.to_lowercase();
    rows.iter().filter(|row| row.matches(&needle)).collect()
}

/// Runs a query and returns its result as pretty-printed JSON.
pub fn run_query(table: Table, action: QueryAction, filter: Option<&str>) -> Result<String, AppError> {
    match table {
        Table::Users => query_rows(table, &USERS, action, filter),
        Table::Products => query_rows(table, &PRODUCTS, action, filter),
        Table::Orders => query_rows(table, &ORDERS, action, filter),
    }
}

fn query_rows<R: Record + Serialize>(
    table: Table,
    rows: &[R],
    action: QueryAction,
    filter: Option<&str>,
) -> Result<String, AppError> {
    let rendered = match (action, filter) {
        (QueryAction::List, _) => serde_json::to_string_pretty(rows),
        (QueryAction::Count, _) => {
            serde_json::to_string_pretty(&format!("Total {}: {}", table.name(), rows.len()))
        }
        (QueryAction::Find, Some(filter)) if !filter.is_empty() => {
            serde_json::to_string_pretty(&find_rows(rows, filter))
        }
        (QueryAction::Find, _) => serde_json::to_string_pretty("Please provide a filter criteria"),
    };

    rendered.map_err(|err| AppError::internal(format!("failed to render query result: {err}")))
}
