pub mod admindtos;
pub mod reservationdtos;
pub mod walletdtos;
pub mod workproofdtos;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub status: String,
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, page: u32, limit: u32) -> Self {
        let total_pages = ((total as f64) / (limit.max(1) as f64)).ceil() as u32;
        Self {
            status: "success".to_string(),
            data,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub const MAX_LIMIT: u32 = 100;

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(20).clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        ((self.page() - 1) as i64) * self.limit() as i64
    }
}
