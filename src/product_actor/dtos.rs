// Catalog listing: filters and pagination.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Product;

pub const DEFAULT_PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Comparison {
    #[default]
    Equal,
    Greater,
    Less,
    NotEqual,
}

impl Comparison {
    pub fn matches<T: PartialOrd>(&self, value: &T, target: &T) -> bool {
        match self {
            Comparison::Equal => value == target,
            Comparison::Greater => value > target,
            Comparison::Less => value < target,
            Comparison::NotEqual => value != target,
        }
    }
}

/// Catalog search. Text filters are case-insensitive substring matches;
/// unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub name: Option<String>,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub is_active: Option<bool>,
    pub price: Option<(Comparison, Decimal)>,
    pub stock: Option<(Comparison, u32)>,
}

fn contains_ci(haystack: &str, needle: &Option<String>) -> bool {
    match needle {
        Some(needle) => haystack.to_lowercase().contains(&needle.trim().to_lowercase()),
        None => true,
    }
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        contains_ci(&product.name, &self.name)
            && contains_ci(&product.category, &self.category)
            && contains_ci(&product.sku, &self.sku)
            && self.is_active.is_none_or(|active| product.is_active == active)
            && self.price.is_none_or(|(cmp, target)| cmp.matches(&product.price, &target))
            && self.stock.is_none_or(|(cmp, target)| cmp.matches(&product.stock, &target))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: DEFAULT_PAGE_LIMIT }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// Cut one page out of an already sorted list. Page 0 and limit 0 fall
    /// back to the defaults.
    pub fn paginate(items: Vec<T>, request: PageRequest) -> Self {
        let page = request.page.max(1);
        let limit = if request.limit == 0 { DEFAULT_PAGE_LIMIT } else { request.limit };
        let total_items = items.len();
        let total_pages = total_items.div_ceil(limit);
        let items: Vec<T> = items.into_iter().skip((page - 1).saturating_mul(limit)).take(limit).collect();
        Self {
            items,
            current_page: page,
            total_pages,
            total_items,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}
