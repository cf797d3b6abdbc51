//! Accounts payable and accounts receivable routes.
//!
//! Both collections are served by the same handlers; the router for each
//! direction carries its [`LedgerDirection`] as a request extension, which
//! picks the URL prefix, the settlement verb (`pay` / `receive`) and the
//! counterparty field names (`supplier_id` / `customer_id`,
//! `paid_by` / `received_by`).

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
};
use ledgerly_core::accounts::{
    AccountStatus, Adjustments, InstallmentPlan, LedgerDirection, LedgerRecord, NewLedgerRecord,
    PaymentDetails, PaymentEvent, PaymentInput, PaymentMethod, RecordUpdate,
};
use ledgerly_db::repositories::{LedgerFilter, LedgerSort, LedgerSortField, SweepScope};
use ledgerly_shared::types::{PageRequest, PageResponse};

/// Default look-ahead window for the due-soon listing.
const DEFAULT_DUE_SOON_DAYS: u32 = 7;

/// Widest look-ahead window the due-soon listing accepts.
const MAX_DUE_SOON_DAYS: u32 = 3650;

/// Creates the routes of one collection (requires auth middleware to be applied externally).
pub fn routes(direction: LedgerDirection) -> Router<AppState> {
    let base = format!("/{}", direction.collection());

    Router::new()
        .route(&base, get(list_records).post(create_record))
        .route(&format!("{base}/overdue"), get(list_overdue))
        .route(&format!("{base}/due-soon"), get(list_due_soon))
        .route(&format!("{base}/pending-approval"), get(list_pending_approval))
        .route(&format!("{base}/totals/by-status/{{status}}"), get(total_by_status))
        .route(
            &format!("{base}/totals/by-counterparty/{{counterparty_id}}"),
            get(total_by_counterparty),
        )
        .route(&format!("{base}/update-overdue-status"), post(update_overdue_status))
        .route(
            &format!("{base}/{{id}}"),
            get(get_record).put(update_record).delete(delete_record),
        )
        .route(&format!("{base}/{{id}}/payments"), get(list_payments))
        .route(&format!("{base}/{{id}}/approve"), post(approve_record))
        .route(
            &format!("{base}/{{id}}/{}", direction.settlement_verb()),
            post(settle_record),
        )
        .route(&format!("{base}/{{id}}/cancel"), post(cancel_record))
        .route(&format!("{base}/{{id}}/installments"), post(generate_installments))
        .layer(Extension(direction))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for searching records.
#[derive(Debug, Default, Deserialize)]
pub struct ListRecordsQuery {
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size (default 20, max 100).
    pub per_page: Option<u32>,
    /// Filter by status.
    pub status: Option<String>,
    /// Filter by supplier / customer.
    #[serde(alias = "supplier_id", alias = "customer_id")]
    pub counterparty_id: Option<Uuid>,
    /// Due on or after (YYYY-MM-DD).
    pub due_date_from: Option<NaiveDate>,
    /// Due on or before (YYYY-MM-DD).
    pub due_date_to: Option<NaiveDate>,
    /// Filter by category.
    pub category_id: Option<Uuid>,
    /// Filter by cost center.
    pub cost_center_id: Option<Uuid>,
    /// Only (or never) records waiting for approval.
    pub pending_approval: Option<bool>,
    /// Only children of this installment plan.
    pub plan_id: Option<Uuid>,
    /// Free-text search over invoice number and description.
    pub search: Option<String>,
    /// Sort column.
    pub sort_by: Option<String>,
    /// `asc` or `desc`.
    pub sort_dir: Option<String>,
}

/// Query parameters for the due-soon listing.
#[derive(Debug, Deserialize)]
pub struct DueSoonQuery {
    /// Look-ahead window in days.
    pub days: Option<u32>,
}

/// Request body for creating a record.
#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    /// Supplier (accounts payable).
    pub supplier_id: Option<Uuid>,
    /// Customer (accounts receivable).
    pub customer_id: Option<Uuid>,
    /// External document reference.
    pub invoice_number: String,
    /// Description.
    pub description: Option<String>,
    /// Face value.
    pub original_amount: Decimal,
    /// Discount (default 0).
    pub discount_amount: Option<Decimal>,
    /// Interest (default 0).
    pub interest_amount: Option<Decimal>,
    /// Fine (default 0).
    pub fine_amount: Option<Decimal>,
    /// Issue date (YYYY-MM-DD).
    pub issue_date: NaiveDate,
    /// Due date (YYYY-MM-DD).
    pub due_date: NaiveDate,
    /// Whether payment needs approval first.
    #[serde(default)]
    pub requires_approval: bool,
    /// Category.
    pub category_id: Option<Uuid>,
    /// Cost center.
    pub cost_center_id: Option<Uuid>,
}

/// Request body for editing an unpaid record.
///
/// Nullable fields distinguish "absent" (keep) from `null` (clear).
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRecordRequest {
    /// Invoice number.
    pub invoice_number: Option<String>,
    /// Description.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    /// Face value.
    pub original_amount: Option<Decimal>,
    /// Discount.
    pub discount_amount: Option<Decimal>,
    /// Interest.
    pub interest_amount: Option<Decimal>,
    /// Fine.
    pub fine_amount: Option<Decimal>,
    /// Category.
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<Uuid>>,
    /// Cost center.
    #[serde(default, deserialize_with = "double_option")]
    pub cost_center_id: Option<Option<Uuid>>,
    /// Approval requirement.
    pub requires_approval: Option<bool>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Request body for approving a record.
#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequest {
    /// Approval notes.
    pub notes: Option<String>,
}

/// Request body for cancelling a record.
#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    /// Cancellation reason.
    pub reason: Option<String>,
}

/// Request body for paying / receiving.
#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    /// Amount applied by this event.
    pub amount: Decimal,
    /// Payment method.
    pub payment_method: String,
    /// Date the money moved (defaults to today).
    pub payment_date: Option<NaiveDate>,
    /// Bank slip number (bank slip only).
    pub bank_slip_number: Option<String>,
    /// Pix key (pix only).
    pub pix_key: Option<String>,
    /// Proof-of-payment reference.
    pub proof_reference: Option<String>,
    /// Interest charged with this payment.
    pub interest_amount: Option<Decimal>,
    /// Fine charged with this payment.
    pub fine_amount: Option<Decimal>,
    /// Discount granted with this payment.
    pub discount_amount: Option<Decimal>,
}

/// Request body for generating an installment plan.
#[derive(Debug, Deserialize)]
pub struct InstallmentsRequest {
    /// Number of installments.
    pub installments: u32,
    /// Monthly compound interest rate, e.g. `0.02`.
    pub interest_rate: Option<Decimal>,
}

/// Counterparty and settling user, named after the collection.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PartyFields {
    /// Accounts payable naming.
    Supplier {
        /// Supplier.
        supplier_id: Uuid,
        /// User who paid.
        paid_by: Option<Uuid>,
    },
    /// Accounts receivable naming.
    Customer {
        /// Customer.
        customer_id: Uuid,
        /// User who received.
        received_by: Option<Uuid>,
    },
}

/// Response for one record.
#[derive(Debug, Serialize)]
pub struct RecordResponse {
    /// Record ID.
    pub id: Uuid,
    /// `payable` or `receivable`.
    pub direction: String,
    /// Counterparty and settling user.
    #[serde(flatten)]
    pub party: PartyFields,
    /// Invoice number.
    pub invoice_number: String,
    /// Description.
    pub description: Option<String>,
    /// Face value.
    pub original_amount: Decimal,
    /// Discount at creation.
    pub discount_amount: Decimal,
    /// Interest at creation.
    pub interest_amount: Decimal,
    /// Fine at creation.
    pub fine_amount: Decimal,
    /// Derived net amount.
    pub net_amount: Decimal,
    /// Total applied so far.
    pub paid_amount: Decimal,
    /// Remaining balance including payment-time adjustments.
    pub outstanding_amount: Decimal,
    /// Running payment-time adjustments.
    pub adjustments: Adjustments,
    /// Issue date.
    pub issue_date: NaiveDate,
    /// Due date.
    pub due_date: NaiveDate,
    /// Latest payment date.
    pub payment_date: Option<NaiveDate>,
    /// Latest payment method.
    pub payment_method: Option<String>,
    /// Latest bank slip number.
    pub bank_slip_number: Option<String>,
    /// Latest pix key.
    pub pix_key: Option<String>,
    /// Latest proof-of-payment reference.
    pub proof_reference: Option<String>,
    /// Status.
    pub status: String,
    /// Whether payment needs approval.
    pub requires_approval: bool,
    /// Approver.
    pub approved_by: Option<Uuid>,
    /// Approval timestamp.
    pub approval_date: Option<DateTime<Utc>>,
    /// Approval notes.
    pub approval_notes: Option<String>,
    /// Category.
    pub category_id: Option<Uuid>,
    /// Cost center.
    pub cost_center_id: Option<Uuid>,
    /// Installment plan this record belongs to.
    pub parent_id: Option<Uuid>,
    /// Position within the plan (1-based).
    pub installment_number: Option<i32>,
    /// Plan size.
    pub installment_count: Option<i32>,
    /// Creator.
    pub created_by: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Canceller.
    pub cancelled_by: Option<Uuid>,
    /// Cancellation timestamp.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Cancellation reason.
    pub cancellation_reason: Option<String>,
    /// Row version.
    pub version: i64,
}

impl From<LedgerRecord> for RecordResponse {
    fn from(record: LedgerRecord) -> Self {
        let party = match record.direction {
            LedgerDirection::Payable => PartyFields::Supplier {
                supplier_id: record.counterparty_id,
                paid_by: record.settled_by,
            },
            LedgerDirection::Receivable => PartyFields::Customer {
                customer_id: record.counterparty_id,
                received_by: record.settled_by,
            },
        };
        let outstanding_amount = record.outstanding_amount();
        let approval = record.approval;
        let cancellation = record.cancellation;
        let installment = record.installment;

        Self {
            id: record.id,
            direction: record.direction.as_str().to_string(),
            party,
            invoice_number: record.invoice_number,
            description: record.description,
            original_amount: record.amounts.original,
            discount_amount: record.amounts.discount,
            interest_amount: record.amounts.interest,
            fine_amount: record.amounts.fine,
            net_amount: record.net_amount,
            paid_amount: record.paid_amount,
            outstanding_amount,
            adjustments: record.adjustments,
            issue_date: record.issue_date,
            due_date: record.due_date,
            payment_date: record.payment_date,
            payment_method: record.payment_method.map(|m| m.as_str().to_string()),
            bank_slip_number: record.payment_details.bank_slip_number().map(str::to_string),
            pix_key: record.payment_details.pix_key().map(str::to_string),
            proof_reference: record.proof_reference,
            status: record.status.as_str().to_string(),
            requires_approval: record.requires_approval,
            approved_by: approval.as_ref().map(|a| a.approved_by),
            approval_date: approval.as_ref().map(|a| a.approval_date),
            approval_notes: approval.and_then(|a| a.approval_notes),
            category_id: record.category_id,
            cost_center_id: record.cost_center_id,
            parent_id: installment.map(|l| l.plan_id),
            installment_number: installment.map(|l| l.number),
            installment_count: installment.map(|l| l.count),
            created_by: record.created_by,
            created_at: record.created_at,
            cancelled_by: cancellation.as_ref().map(|c| c.cancelled_by),
            cancelled_at: cancellation.as_ref().map(|c| c.cancelled_at),
            cancellation_reason: cancellation.and_then(|c| c.reason),
            version: record.version,
        }
    }
}

/// Response for one payment history row.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    /// Event ID.
    pub id: Uuid,
    /// Amount credited.
    pub amount: Decimal,
    /// Date the money moved.
    pub payment_date: NaiveDate,
    /// Payment method.
    pub payment_method: String,
    /// Bank slip number.
    pub bank_slip_number: Option<String>,
    /// Pix key.
    pub pix_key: Option<String>,
    /// Proof-of-payment reference.
    pub proof_reference: Option<String>,
    /// Adjustments charged or granted with this event.
    pub adjustments: Adjustments,
    /// Effective due amount at the time.
    pub effective_due_amount: Decimal,
    /// Status the record ended in.
    pub resulting_status: String,
    /// Acting user.
    pub created_by: Uuid,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

impl From<PaymentEvent> for PaymentResponse {
    fn from(event: PaymentEvent) -> Self {
        Self {
            id: event.id,
            amount: event.amount,
            payment_date: event.payment_date,
            payment_method: event.method.as_str().to_string(),
            bank_slip_number: event.details.bank_slip_number().map(str::to_string),
            pix_key: event.details.pix_key().map(str::to_string),
            proof_reference: event.proof_reference,
            adjustments: event.adjustments,
            effective_due_amount: event.effective_due_amount,
            resulting_status: event.resulting_status.as_str().to_string(),
            created_by: event.created_by,
            created_at: event.created_at,
        }
    }
}

/// Response for a generated installment plan.
#[derive(Debug, Serialize)]
pub struct InstallmentPlanResponse {
    /// Plan ID.
    pub id: Uuid,
    /// The record the plan replaced.
    pub source_record_id: Uuid,
    /// Number of installments.
    pub installment_count: i32,
    /// Sum of the children's net amounts.
    pub total_amount: Decimal,
    /// Monthly interest rate, if any.
    pub interest_rate: Option<Decimal>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// The installments, in due-date order.
    pub installments: Vec<RecordResponse>,
}

impl From<InstallmentPlan> for InstallmentPlanResponse {
    fn from(plan: InstallmentPlan) -> Self {
        Self {
            id: plan.header.id,
            source_record_id: plan.header.source_record_id,
            installment_count: plan.header.installment_count,
            total_amount: plan.header.total_amount,
            interest_rate: plan.header.interest_rate,
            created_at: plan.header.created_at,
            installments: plan.children.into_iter().map(RecordResponse::from).collect(),
        }
    }
}

// ============================================================================
// Request parsing
// ============================================================================

fn parse_status(raw: &str) -> ApiResult<AccountStatus> {
    AccountStatus::parse(raw).ok_or_else(|| {
        ApiError::validation(format!(
            "unknown status '{raw}'; expected one of: pending, partially_paid, paid, overdue, cancelled"
        ))
    })
}

fn parse_sort(query: &ListRecordsQuery) -> ApiResult<LedgerSort> {
    let field = match query.sort_by.as_deref() {
        None => LedgerSortField::default(),
        Some(raw) => LedgerSortField::parse(raw)
            .ok_or_else(|| ApiError::validation(format!("cannot sort by '{raw}'")))?,
    };
    let descending = match query.sort_dir.as_deref().map(str::to_lowercase).as_deref() {
        None | Some("asc") => false,
        Some("desc") => true,
        Some(other) => {
            return Err(ApiError::validation(format!(
                "sort_dir must be 'asc' or 'desc', got '{other}'"
            )));
        }
    };
    Ok(LedgerSort { field, descending })
}

fn build_filter(query: &ListRecordsQuery) -> ApiResult<LedgerFilter> {
    Ok(LedgerFilter {
        status: query.status.as_deref().map(parse_status).transpose()?,
        counterparty_id: query.counterparty_id,
        due_date_from: query.due_date_from,
        due_date_to: query.due_date_to,
        category_id: query.category_id,
        cost_center_id: query.cost_center_id,
        pending_approval: query.pending_approval,
        plan_id: query.plan_id,
        search: query.search.clone(),
    })
}

fn counterparty_for(direction: LedgerDirection, request: &CreateRecordRequest) -> ApiResult<Uuid> {
    let (own, other) = match direction {
        LedgerDirection::Payable => (request.supplier_id, request.customer_id),
        LedgerDirection::Receivable => (request.customer_id, request.supplier_id),
    };
    let kind = direction.counterparty_kind();
    if other.is_some() {
        return Err(ApiError::validation(format!(
            "{} records take a {kind}_id",
            direction.collection()
        )));
    }
    own.ok_or_else(|| ApiError::validation(format!("{kind}_id is required")))
}

fn payment_input(request: SettleRequest, settled_by: Uuid) -> ApiResult<PaymentInput> {
    let method = PaymentMethod::parse(&request.payment_method).ok_or_else(|| {
        ApiError::validation(format!("unknown payment method '{}'", request.payment_method))
    })?;
    let details = PaymentDetails::for_method(method, request.bank_slip_number, request.pix_key)?;
    let adjustments = Adjustments::new(
        request.interest_amount,
        request.fine_amount,
        request.discount_amount,
    )?;

    Ok(PaymentInput {
        amount: request.amount,
        method,
        details,
        payment_date: request
            .payment_date
            .unwrap_or_else(|| Utc::now().date_naive()),
        proof_reference: request.proof_reference,
        adjustments,
        settled_by,
    })
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/{collection}` - Paged, filtered search.
async fn list_records(
    State(state): State<AppState>,
    Extension(direction): Extension<LedgerDirection>,
    auth: AuthUser,
    Query(query): Query<ListRecordsQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = build_filter(&query)?;
    let sort = parse_sort(&query)?;
    let page = PageRequest::new(query.page, query.per_page);

    let (records, total) = state
        .ledger
        .search(auth.organization_id(), direction, &filter, sort, &page)
        .await?;

    let response = PageResponse::new(records, page.page, page.per_page, total)
        .map(RecordResponse::from);
    Ok(Json(response))
}

/// POST `/{collection}` - Create a record.
async fn create_record(
    State(state): State<AppState>,
    Extension(direction): Extension<LedgerDirection>,
    auth: AuthUser,
    Json(payload): Json<CreateRecordRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.role().ensure_can_write("create ledger records")?;
    let counterparty_id = counterparty_for(direction, &payload)?;

    let input = NewLedgerRecord {
        organization_id: auth.organization_id(),
        direction,
        counterparty_id,
        invoice_number: payload.invoice_number,
        description: payload.description,
        original_amount: payload.original_amount,
        discount_amount: payload.discount_amount.unwrap_or_default(),
        interest_amount: payload.interest_amount.unwrap_or_default(),
        fine_amount: payload.fine_amount.unwrap_or_default(),
        issue_date: payload.issue_date,
        due_date: payload.due_date,
        requires_approval: payload.requires_approval,
        category_id: payload.category_id,
        cost_center_id: payload.cost_center_id,
    };

    let record = state.ledger.create(input, auth.user_id()).await?;
    let location = format!("/api/v1/{}/{}", direction.collection(), record.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(RecordResponse::from(record)),
    ))
}

/// GET `/{collection}/{id}` - Fetch one record.
async fn get_record(
    State(state): State<AppState>,
    Extension(direction): Extension<LedgerDirection>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let record = state
        .ledger
        .get(auth.organization_id(), direction, id)
        .await?;
    Ok(Json(RecordResponse::from(record)))
}

/// PUT `/{collection}/{id}` - Edit a record before any payment.
async fn update_record(
    State(state): State<AppState>,
    Extension(direction): Extension<LedgerDirection>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRecordRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.role().ensure_can_write("edit ledger records")?;
    let update = RecordUpdate {
        invoice_number: payload.invoice_number,
        description: payload.description,
        original_amount: payload.original_amount,
        discount_amount: payload.discount_amount,
        interest_amount: payload.interest_amount,
        fine_amount: payload.fine_amount,
        category_id: payload.category_id,
        cost_center_id: payload.cost_center_id,
        requires_approval: payload.requires_approval,
    };

    let record = state
        .ledger
        .update(auth.organization_id(), direction, id, update, auth.user_id())
        .await?;
    Ok(Json(RecordResponse::from(record)))
}

/// DELETE `/{collection}/{id}` - Delete a pending record with no payments.
async fn delete_record(
    State(state): State<AppState>,
    Extension(direction): Extension<LedgerDirection>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    auth.role().ensure_can_write("delete ledger records")?;
    state
        .ledger
        .delete(auth.organization_id(), direction, id, auth.user_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/{collection}/{id}/payments` - Payment history.
async fn list_payments(
    State(state): State<AppState>,
    Extension(direction): Extension<LedgerDirection>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let payments: Vec<PaymentResponse> = state
        .ledger
        .payments(auth.organization_id(), direction, id)
        .await?
        .into_iter()
        .map(PaymentResponse::from)
        .collect();
    Ok(Json(json!({ "payments": payments })))
}

/// POST `/{collection}/{id}/approve` - Approve a gated record.
async fn approve_record(
    State(state): State<AppState>,
    Extension(direction): Extension<LedgerDirection>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApproveRequest>,
) -> ApiResult<impl IntoResponse> {
    let record = state
        .ledger
        .approve(
            auth.organization_id(),
            direction,
            id,
            auth.user_id(),
            auth.role(),
            payload.notes,
        )
        .await?;
    Ok(Json(RecordResponse::from(record)))
}

/// POST `/{collection}/{id}/pay` or `/receive` - Apply a payment.
async fn settle_record(
    State(state): State<AppState>,
    Extension(direction): Extension<LedgerDirection>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SettleRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.role().ensure_can_write("settle ledger records")?;
    let input = payment_input(payload, auth.user_id())?;
    let record = state
        .ledger
        .apply_payment(auth.organization_id(), direction, id, input)
        .await?;
    Ok(Json(RecordResponse::from(record)))
}

/// POST `/{collection}/{id}/cancel` - Administrative cancellation.
async fn cancel_record(
    State(state): State<AppState>,
    Extension(direction): Extension<LedgerDirection>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.role().ensure_can_write("cancel ledger records")?;
    let record = state
        .ledger
        .cancel(
            auth.organization_id(),
            direction,
            id,
            auth.user_id(),
            payload.reason,
        )
        .await?;
    Ok(Json(RecordResponse::from(record)))
}

/// POST `/{collection}/{id}/installments` - Replace a record by an installment plan.
async fn generate_installments(
    State(state): State<AppState>,
    Extension(direction): Extension<LedgerDirection>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<InstallmentsRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.role().ensure_can_write("split ledger records into installments")?;
    let plan = state
        .ledger
        .generate_installments(
            auth.organization_id(),
            direction,
            id,
            payload.installments,
            payload.interest_rate,
            auth.user_id(),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(InstallmentPlanResponse::from(plan)),
    ))
}

/// GET `/{collection}/overdue`
async fn list_overdue(
    State(state): State<AppState>,
    Extension(direction): Extension<LedgerDirection>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let records = state
        .ledger
        .list_overdue(auth.organization_id(), direction)
        .await?;
    Ok(records_json(records))
}

/// GET `/{collection}/due-soon?days=N`
async fn list_due_soon(
    State(state): State<AppState>,
    Extension(direction): Extension<LedgerDirection>,
    auth: AuthUser,
    Query(query): Query<DueSoonQuery>,
) -> ApiResult<impl IntoResponse> {
    let days = query.days.unwrap_or(DEFAULT_DUE_SOON_DAYS);
    if days > MAX_DUE_SOON_DAYS {
        return Err(ApiError::validation(format!(
            "days must be at most {MAX_DUE_SOON_DAYS}, got {days}"
        )));
    }
    let today = Utc::now().date_naive();
    let records = state
        .ledger
        .list_due_soon(auth.organization_id(), direction, today, days)
        .await?;
    Ok(records_json(records))
}

/// GET `/{collection}/pending-approval`
async fn list_pending_approval(
    State(state): State<AppState>,
    Extension(direction): Extension<LedgerDirection>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let records = state
        .ledger
        .list_pending_approval(auth.organization_id(), direction)
        .await?;
    Ok(records_json(records))
}

/// GET `/{collection}/totals/by-status/{status}`
async fn total_by_status(
    State(state): State<AppState>,
    Extension(direction): Extension<LedgerDirection>,
    auth: AuthUser,
    Path(status): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let status = parse_status(&status)?;
    let total = state
        .ledger
        .total_by_status(auth.organization_id(), direction, status)
        .await?;
    Ok(Json(json!({ "status": status.as_str(), "total": total })))
}

/// GET `/{collection}/totals/by-counterparty/{counterparty_id}`
async fn total_by_counterparty(
    State(state): State<AppState>,
    Extension(direction): Extension<LedgerDirection>,
    auth: AuthUser,
    Path(counterparty_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let total = state
        .ledger
        .total_by_counterparty(auth.organization_id(), direction, counterparty_id)
        .await?;
    let key = format!("{}_id", direction.counterparty_kind());
    Ok(Json(json!({ key: counterparty_id, "total": total })))
}

/// POST `/{collection}/update-overdue-status` - Run the overdue sweep for this collection now.
async fn update_overdue_status(
    State(state): State<AppState>,
    Extension(direction): Extension<LedgerDirection>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    auth.role().ensure_can_write("run the overdue sweep")?;
    let scope = SweepScope::Collection {
        organization_id: auth.organization_id(),
        direction,
    };
    let updated = state.ledger.sweep_overdue(Utc::now(), scope).await?;
    Ok(Json(json!({ "updated": updated })))
}

fn records_json(records: Vec<LedgerRecord>) -> Json<serde_json::Value> {
    let data: Vec<RecordResponse> = records.into_iter().map(RecordResponse::from).collect();
    Json(json!({ "data": data }))
}
