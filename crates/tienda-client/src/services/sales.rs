//! # Sales Service
//!
//! Sales listing and CRUD, invoices, reports and exports.
//!
//! Report payloads (`summary`, `top_products`, `by_date`) are chart data
//! whose shape belongs to the server; they are passed through as JSON.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use tienda_core::{BranchId, CategoryId, NewSale, Paginated, PaymentMethod, Sale, SaleId};

use super::{PageRequest, Resource};
use crate::api::{ApiClient, Params};
use crate::error::ClientResult;

const SALES: &str = "/sales";

// =============================================================================
// Query Types
// =============================================================================

/// Filters of the sales table. `"all"` in either select means no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleFilters {
    #[serde(flatten)]
    pub page: PageRequest,
    pub status: Option<String>,
    pub branch_id: Option<String>,
}

impl SaleFilters {
    pub fn for_branch(branch_id: BranchId) -> Self {
        SaleFilters {
            branch_id: Some(branch_id.to_string()),
            ..Default::default()
        }
    }

    fn params(&self) -> Params {
        let params = Params::new()
            .filter("status", self.status.as_deref())
            .filter("branch_id", self.branch_id.as_deref());
        self.page.apply(params)
    }
}

/// Date window and scope shared by the summary and the exports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilters {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub branch_id: Option<BranchId>,
    /// Only used by exports.
    pub status: Option<String>,
}

impl ReportFilters {
    fn params(&self) -> Params {
        Params::new()
            .opt("start_date", self.start_date)
            .opt("end_date", self.end_date)
            .opt("branch_id", self.branch_id)
            .filter("status", self.status.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopProductsQuery {
    pub category_id: Option<CategoryId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<u32>,
}

/// Window of the sales-by-date chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    Day,
    #[default]
    Week,
    Month,
    Year,
}

impl DateRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateRange::Day => "day",
            DateRange::Week => "week",
            DateRange::Month => "month",
            DateRange::Year => "year",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Excel,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Excel => "excel",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone)]
pub struct SaleService {
    api: ApiClient,
}

impl SaleService {
    pub fn new(api: ApiClient) -> Self {
        SaleService { api }
    }

    fn resource(&self) -> Resource<'_> {
        Resource::new(&self.api, SALES)
    }

    pub(crate) fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Missing client, branch and status fields decode to their display
    /// defaults (see [`Sale`]).
    pub async fn list(&self, filters: &SaleFilters) -> ClientResult<Paginated<Sale>> {
        self.resource().list(&filters.params(), filters.page).await
    }

    pub async fn get(&self, id: SaleId) -> ClientResult<Sale> {
        self.resource().get(id).await
    }

    /// Single atomic creation request. Prefer
    /// [`SaleComposer`](crate::workflow::SaleComposer), which validates
    /// the draft and the stock first.
    pub async fn create(&self, sale: &NewSale) -> ClientResult<Sale> {
        self.resource().create(sale).await
    }

    pub async fn update(&self, id: SaleId, sale: &NewSale) -> ClientResult<Sale> {
        self.resource().update(id, sale).await
    }

    pub async fn delete(&self, id: SaleId) -> ClientResult<()> {
        self.resource().delete(id).await
    }

    /// Invoice PDF.
    pub async fn invoice(&self, id: SaleId) -> ClientResult<Vec<u8>> {
        let path = format!("{}/{}/invoice", SALES, id);
        let pdf = self.api.get_bytes(&path, &Params::new()).await?;
        info!(sale_id = id, bytes = pdf.len(), "Invoice downloaded");
        Ok(pdf)
    }

    pub async fn summary(&self, filters: &ReportFilters) -> ClientResult<serde_json::Value> {
        let params = Params::new()
            .opt("start_date", filters.start_date)
            .opt("end_date", filters.end_date)
            .opt("branch_id", filters.branch_id);
        self.api.get("/sales/report/summary", &params).await
    }

    pub async fn top_products(&self, query: &TopProductsQuery) -> ClientResult<serde_json::Value> {
        let params = Params::new()
            .opt("category_id", query.category_id)
            .opt("start_date", query.start_date)
            .opt("end_date", query.end_date)
            .opt("limit", query.limit);
        self.api.get("/sales/report/top-products", &params).await
    }

    pub async fn by_date(&self, range: DateRange) -> ClientResult<serde_json::Value> {
        let params = Params::new().with("date_range", range.as_str());
        self.api.get("/sales/report/by-date", &params).await
    }

    /// Sales of one branch, as a plain filter rather than a report.
    pub async fn by_branch(&self, branch_id: BranchId) -> ClientResult<Vec<Sale>> {
        Resource::new(&self.api, "/sales/by-branch")
            .all(&Params::new().with("branch_id", branch_id))
            .await
    }

    /// Exported file contents in `format`.
    pub async fn export(&self, format: ExportFormat, filters: &ReportFilters) -> ClientResult<Vec<u8>> {
        let path = format!("{}/export/{}", SALES, format.as_str());
        let bytes = self.api.get_bytes(&path, &filters.params()).await?;
        info!(format = format.as_str(), bytes = bytes.len(), "Sales exported");
        Ok(bytes)
    }

    pub async fn payment_methods(&self) -> ClientResult<Vec<PaymentMethod>> {
        Resource::new(&self.api, "/payment-methods")
            .all(&Params::new())
            .await
    }
}
