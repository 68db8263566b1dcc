use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::AppServices;
use crate::domain::address::{Address, SavedAddress, SavedAddressPatch};
use crate::errors::AppError;

use super::auth::Identity;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAddressRequest {
    pub label: String,
    pub address: Address,
    #[serde(default)]
    pub is_default: bool,
}

/// Fields left out are not changed.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAddressRequest {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub is_default: Option<bool>,
}

impl From<UpdateAddressRequest> for SavedAddressPatch {
    fn from(req: UpdateAddressRequest) -> Self {
        SavedAddressPatch {
            label: req.label,
            address: req.address,
            is_default: req.is_default,
        }
    }
}

/// GET /saved-addresses
#[utoipa::path(
    get,
    path = "/saved-addresses",
    responses(
        (status = 200, description = "Default first, then oldest first", body = [SavedAddress]),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("bearer" = [])),
    tag = "addresses"
)]
pub async fn list_addresses(services: web::Data<AppServices>, identity: Identity) -> Result<HttpResponse, AppError> {
    let addresses = web::block(move || services.addresses.list(&identity.email)).await??;
    Ok(HttpResponse::Ok().json(addresses))
}

/// POST /saved-addresses
#[utoipa::path(
    post,
    path = "/saved-addresses",
    request_body = CreateAddressRequest,
    responses(
        (status = 201, description = "Address saved", body = SavedAddress),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("bearer" = [])),
    tag = "addresses"
)]
pub async fn create_address(
    services: web::Data<AppServices>,
    identity: Identity,
    body: web::Json<CreateAddressRequest>,
) -> Result<HttpResponse, AppError> {
    let req = body.into_inner();
    let saved = web::block(move || {
        services
            .addresses
            .create(&identity.email, &req.label, req.address, req.is_default)
    })
    .await??;
    Ok(HttpResponse::Created().json(saved))
}

/// PATCH /saved-addresses/{id}
#[utoipa::path(
    patch,
    path = "/saved-addresses/{id}",
    params(
        ("id" = Uuid, Path, description = "Saved address UUID"),
    ),
    request_body = UpdateAddressRequest,
    responses(
        (status = 200, description = "Address updated", body = SavedAddress),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No such address for this user"),
    ),
    security(("bearer" = [])),
    tag = "addresses"
)]
pub async fn update_address(
    services: web::Data<AppServices>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<UpdateAddressRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let patch = SavedAddressPatch::from(body.into_inner());
    let saved = web::block(move || services.addresses.update(&identity.email, id, patch)).await??;
    Ok(HttpResponse::Ok().json(saved))
}

/// DELETE /saved-addresses/{id}
#[utoipa::path(
    delete,
    path = "/saved-addresses/{id}",
    params(
        ("id" = Uuid, Path, description = "Saved address UUID"),
    ),
    responses(
        (status = 204, description = "Address deleted"),
        (status = 404, description = "No such address for this user"),
    ),
    security(("bearer" = [])),
    tag = "addresses"
)]
pub async fn delete_address(
    services: web::Data<AppServices>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || services.addresses.delete(&identity.email, id)).await??;
    Ok(HttpResponse::NoContent().finish())
}
