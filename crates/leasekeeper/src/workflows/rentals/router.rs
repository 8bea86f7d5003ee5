use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::applications::ApplicationSubmission;
use super::desk::RentalDesk;
use super::documents::DocumentStorage;
use super::domain::{
    ApplicationDecision, ApplicationId, Caller, LeaseId, ListingStatus, MaintenanceRequestId,
    MaintenanceStatus, PaymentId, PropertyId, Role, UserId,
};
use super::error::{ErrorKind, RentalError};
use super::leases::LeaseOptions;
use super::maintenance::MaintenanceTicket;
use super::properties::{ListingFilter, NewProperty};
use super::store::EntityStore;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Router exposing the rental workflows. Callers are identified by the `x-user-id` and
/// `x-user-role` headers set by the fronting auth layer.
pub fn rentals_router<S, D>(desk: Arc<RentalDesk<S, D>>) -> Router
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    Router::new()
        .route(
            "/api/v1/properties",
            post(register_property_handler::<S, D>).get(search_properties_handler::<S, D>),
        )
        .route(
            "/api/v1/properties/import",
            post(import_properties_handler::<S, D>),
        )
        .route(
            "/api/v1/properties/:property_id/availability",
            get(availability_handler::<S, D>),
        )
        .route(
            "/api/v1/properties/:property_id/listing",
            post(listing_handler::<S, D>),
        )
        .route(
            "/api/v1/applications",
            post(submit_application_handler::<S, D>).get(list_applications_handler::<S, D>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler::<S, D>),
        )
        .route(
            "/api/v1/applications/:application_id/decision",
            post(decision_handler::<S, D>),
        )
        .route(
            "/api/v1/leases",
            post(create_lease_handler::<S, D>).get(list_leases_handler::<S, D>),
        )
        .route("/api/v1/leases/:lease_id", get(lease_handler::<S, D>))
        .route(
            "/api/v1/leases/:lease_id/tenant",
            post(assign_tenant_handler::<S, D>),
        )
        .route(
            "/api/v1/leases/:lease_id/document",
            post(attach_document_handler::<S, D>),
        )
        .route(
            "/api/v1/leases/:lease_id/upload",
            post(upload_document_handler::<S, D>),
        )
        .route("/api/v1/leases/:lease_id/sign", post(sign_handler::<S, D>))
        .route(
            "/api/v1/leases/:lease_id/reject",
            post(reject_handler::<S, D>),
        )
        .route(
            "/api/v1/leases/:lease_id/activate",
            post(activate_handler::<S, D>),
        )
        .route(
            "/api/v1/payments",
            post(schedule_payment_handler::<S, D>).get(list_payments_handler::<S, D>),
        )
        .route(
            "/api/v1/payments/:payment_id/pay",
            post(pay_handler::<S, D>),
        )
        .route(
            "/api/v1/maintenance",
            post(submit_maintenance_handler::<S, D>).get(list_maintenance_handler::<S, D>),
        )
        .route(
            "/api/v1/maintenance/:request_id/status",
            post(maintenance_status_handler::<S, D>),
        )
        .route("/api/v1/summary", get(summary_handler::<S, D>))
        .route("/api/v1/tenants", get(tenants_handler::<S, D>))
        .with_state(desk)
}

type DeskState<S, D> = State<Arc<RentalDesk<S, D>>>;

#[derive(Debug, Deserialize)]
pub struct ListingRequest {
    pub listing: ListingStatus,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: ApplicationDecision,
}

#[derive(Debug, Deserialize)]
pub struct CreateLeaseRequest {
    pub property_id: PropertyId,
    #[serde(flatten)]
    pub options: LeaseOptions,
}

#[derive(Debug, Deserialize)]
pub struct AssignTenantRequest {
    pub tenant_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct AttachDocumentRequest {
    pub document_url: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivateRequest {
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRentRequest {
    pub lease_id: LeaseId,
    pub due_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct MaintenanceSubmission {
    pub property_id: PropertyId,
    #[serde(flatten)]
    pub ticket: MaintenanceTicket,
}

#[derive(Debug, Deserialize)]
pub struct MaintenanceStatusRequest {
    pub status: MaintenanceStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

/// Resolve the acting identity from the auth headers.
pub fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, Response> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let role = headers
        .get(USER_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(Role::parse);

    match (user_id, role) {
        (Some(user_id), Some(role)) => Ok(Caller {
            user_id: UserId::from(user_id),
            role,
        }),
        _ => {
            let payload = json!({
                "error": "unauthenticated",
                "detail": format!(
                    "requests must carry {} and {} (tenant or landlord) headers",
                    USER_ID_HEADER, USER_ROLE_HEADER
                ),
            });
            Err((StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response())
        }
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::InvalidState | ErrorKind::VersionConflict => StatusCode::CONFLICT,
        ErrorKind::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub fn error_response(err: &RentalError) -> Response {
    let kind = err.kind();
    let status = status_for(kind);
    if status.is_server_error() {
        error!(error = %err, "rental backend failure");
    }

    let payload = json!({
        "error": kind.label(),
        "detail": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

/// Malformed or mistyped JSON bodies surface as `validation_failed`.
fn json_rejection(rejection: JsonRejection) -> Response {
    error_response(&RentalError::validation(rejection.body_text()))
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, RentalError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(err) => error_response(&err),
    }
}

macro_rules! body_or_reject {
    ($body:expr) => {
        match $body {
            Ok(axum::Json(body)) => body,
            Err(rejection) => return json_rejection(rejection),
        }
    };
}

macro_rules! caller_or_reject {
    ($headers:expr) => {
        match caller_from_headers(&$headers) {
            Ok(caller) => caller,
            Err(response) => return response,
        }
    };
}

pub(crate) async fn register_property_handler<S, D>(
    State(desk): DeskState<S, D>,
    headers: HeaderMap,
    property: Result<axum::Json<NewProperty>, JsonRejection>,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    let property = body_or_reject!(property);
    respond(StatusCode::CREATED, desk.properties.register(&caller, property))
}

pub(crate) async fn search_properties_handler<S, D>(
    State(desk): DeskState<S, D>,
    Query(filter): Query<ListingFilter>,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    respond(StatusCode::OK, desk.properties.search(&filter))
}

pub(crate) async fn import_properties_handler<S, D>(
    State(desk): DeskState<S, D>,
    headers: HeaderMap,
    body: String,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::CREATED,
        desk.properties.import_csv(&caller, body.as_bytes()),
    )
}

pub(crate) async fn availability_handler<S, D>(
    State(desk): DeskState<S, D>,
    Path(property_id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    respond(
        StatusCode::OK,
        desk.availability.snapshot(&PropertyId(property_id)),
    )
}

pub(crate) async fn listing_handler<S, D>(
    State(desk): DeskState<S, D>,
    Path(property_id): Path<String>,
    headers: HeaderMap,
    request: Result<axum::Json<ListingRequest>, JsonRejection>,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    let request = body_or_reject!(request);
    respond(
        StatusCode::OK,
        desk.properties
            .set_listing(&caller, &PropertyId(property_id), request.listing),
    )
}

pub(crate) async fn submit_application_handler<S, D>(
    State(desk): DeskState<S, D>,
    headers: HeaderMap,
    submission: Result<axum::Json<ApplicationSubmission>, JsonRejection>,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    let submission = body_or_reject!(submission);
    respond(
        StatusCode::CREATED,
        desk.applications.submit(&caller, submission),
    )
}

pub(crate) async fn list_applications_handler<S, D>(
    State(desk): DeskState<S, D>,
    headers: HeaderMap,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(StatusCode::OK, desk.applications.list_for(&caller))
}

pub(crate) async fn application_handler<S, D>(
    State(desk): DeskState<S, D>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::OK,
        desk.applications
            .get(&caller, &ApplicationId(application_id)),
    )
}

pub(crate) async fn decision_handler<S, D>(
    State(desk): DeskState<S, D>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    request: Result<axum::Json<DecisionRequest>, JsonRejection>,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    let request = body_or_reject!(request);
    respond(
        StatusCode::OK,
        desk.applications
            .resolve(&caller, &ApplicationId(application_id), request.decision),
    )
}

pub(crate) async fn create_lease_handler<S, D>(
    State(desk): DeskState<S, D>,
    headers: HeaderMap,
    request: Result<axum::Json<CreateLeaseRequest>, JsonRejection>,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    let request = body_or_reject!(request);
    let CreateLeaseRequest {
        property_id,
        options,
    } = request;
    respond(
        StatusCode::CREATED,
        desk.leases.create(&caller, &property_id, options),
    )
}

pub(crate) async fn list_leases_handler<S, D>(
    State(desk): DeskState<S, D>,
    headers: HeaderMap,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(StatusCode::OK, desk.leases.list_for(&caller))
}

pub(crate) async fn lease_handler<S, D>(
    State(desk): DeskState<S, D>,
    Path(lease_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(StatusCode::OK, desk.leases.get(&caller, &LeaseId(lease_id)))
}

pub(crate) async fn assign_tenant_handler<S, D>(
    State(desk): DeskState<S, D>,
    Path(lease_id): Path<String>,
    headers: HeaderMap,
    request: Result<axum::Json<AssignTenantRequest>, JsonRejection>,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    let request = body_or_reject!(request);
    respond(
        StatusCode::OK,
        desk.leases
            .assign_tenant(&caller, &LeaseId(lease_id), &request.tenant_id),
    )
}

pub(crate) async fn attach_document_handler<S, D>(
    State(desk): DeskState<S, D>,
    Path(lease_id): Path<String>,
    headers: HeaderMap,
    request: Result<axum::Json<AttachDocumentRequest>, JsonRejection>,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    let request = body_or_reject!(request);
    respond(
        StatusCode::OK,
        desk.leases
            .attach_document(&caller, &LeaseId(lease_id), &request.document_url),
    )
}

pub(crate) async fn upload_document_handler<S, D>(
    State(desk): DeskState<S, D>,
    Path(lease_id): Path<String>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let file_name = query.file_name.unwrap_or_default();
    respond(
        StatusCode::OK,
        desk.leases.upload_document(
            &caller,
            &LeaseId(lease_id),
            &file_name,
            &body,
            content_type,
        ),
    )
}

pub(crate) async fn sign_handler<S, D>(
    State(desk): DeskState<S, D>,
    Path(lease_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(StatusCode::OK, desk.leases.sign(&caller, &LeaseId(lease_id)))
}

pub(crate) async fn reject_handler<S, D>(
    State(desk): DeskState<S, D>,
    Path(lease_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::OK,
        desk.leases.reject(&caller, &LeaseId(lease_id)),
    )
}

pub(crate) async fn activate_handler<S, D>(
    State(desk): DeskState<S, D>,
    Path(lease_id): Path<String>,
    headers: HeaderMap,
    request: Result<axum::Json<ActivateRequest>, JsonRejection>,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    let request = body_or_reject!(request);
    let today = request.today.unwrap_or_else(|| Utc::now().date_naive());
    respond(
        StatusCode::OK,
        desk.leases.activate(&caller, &LeaseId(lease_id), today),
    )
}

pub(crate) async fn schedule_payment_handler<S, D>(
    State(desk): DeskState<S, D>,
    headers: HeaderMap,
    request: Result<axum::Json<ScheduleRentRequest>, JsonRejection>,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    let request = body_or_reject!(request);
    respond(
        StatusCode::CREATED,
        desk.payments
            .schedule(&caller, &request.lease_id, request.due_date),
    )
}

pub(crate) async fn list_payments_handler<S, D>(
    State(desk): DeskState<S, D>,
    headers: HeaderMap,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(StatusCode::OK, desk.payments.list_for(&caller))
}

pub(crate) async fn pay_handler<S, D>(
    State(desk): DeskState<S, D>,
    Path(payment_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::OK,
        desk.payments.pay(&caller, &PaymentId(payment_id)),
    )
}

pub(crate) async fn submit_maintenance_handler<S, D>(
    State(desk): DeskState<S, D>,
    headers: HeaderMap,
    request: Result<axum::Json<MaintenanceSubmission>, JsonRejection>,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    let request = body_or_reject!(request);
    let MaintenanceSubmission {
        property_id,
        ticket,
    } = request;
    respond(
        StatusCode::CREATED,
        desk.maintenance.submit(&caller, &property_id, ticket),
    )
}

pub(crate) async fn list_maintenance_handler<S, D>(
    State(desk): DeskState<S, D>,
    headers: HeaderMap,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(StatusCode::OK, desk.maintenance.list_for(&caller))
}

pub(crate) async fn maintenance_status_handler<S, D>(
    State(desk): DeskState<S, D>,
    Path(request_id): Path<String>,
    headers: HeaderMap,
    request: Result<axum::Json<MaintenanceStatusRequest>, JsonRejection>,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    let request = body_or_reject!(request);
    respond(
        StatusCode::OK,
        desk.maintenance.update_status(
            &caller,
            &MaintenanceRequestId(request_id),
            request.status,
        ),
    )
}

pub(crate) async fn summary_handler<S, D>(
    State(desk): DeskState<S, D>,
    headers: HeaderMap,
    Query(query): Query<SummaryQuery>,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    match caller.role {
        Role::Landlord => {
            let today = query.today.unwrap_or_else(|| Utc::now().date_naive());
            respond(StatusCode::OK, desk.reports.landlord_summary(&caller, today))
        }
        Role::Tenant => respond(StatusCode::OK, desk.reports.tenant_summary(&caller)),
    }
}

pub(crate) async fn tenants_handler<S, D>(
    State(desk): DeskState<S, D>,
    headers: HeaderMap,
) -> Response
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(StatusCode::OK, desk.reports.tenants_for(&caller))
}
