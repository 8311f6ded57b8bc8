//! The mock request pipeline
//!
//! Every request that is not technical traffic lands here:
//!
//! 1. consult the scenario registry — a match pins the full response and
//!    mock handling never runs;
//! 2. resolve the section claiming the path — none means 404 for reads and
//!    400 for writes;
//! 3. extract external IDs, run request hooks, dispatch by verb against the
//!    store, run response hooks, assemble the response.

use crate::error::ApiError;
use crate::AppState;
use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::debug;
use unimock_core::{path_tail_id, Error, Resource, ResourceDraft, Scenario, Section};

/// Router fallback: handle one mock request.
pub async fn handle(State(state): State<AppState>, req: Request<Body>) -> Response {
    match pipeline(state, req).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn pipeline(state: AppState, req: Request<Body>) -> Result<Response, ApiError> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    state.metrics.record_request(&method);

    // Scenarios win over everything, for any method.
    if let Some(scenario) = state.scenarios.match_request(method.as_str(), &path).await {
        state.metrics.record_scenario_hit();
        debug!(method = %method, path = %path, uuid = ?scenario.uuid, "request answered by scenario");
        return scenario_response(&scenario).map_err(ApiError);
    }

    if !matches!(method, Method::GET | Method::POST | Method::PUT | Method::DELETE) {
        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
    }

    let Some(section) = state.sections.match_path(&path) else {
        debug!(method = %method, path = %path, "no section claims path");
        return Err(ApiError(match method {
            Method::GET | Method::DELETE => Error::not_found(path),
            _ => Error::invalid_request(format!("no section claims path {path}")),
        }));
    };

    debug!(section = %section.name, method = %method, path = %path, "section matched");

    // Reads key off the path alone; only the writing verbs extract IDs.
    if method == Method::GET {
        return handle_get(&state, section, &path).await;
    }

    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let headers = req.headers().clone();

    // Only creating/updating requests carry a meaningful body.
    let body = if matches!(method, Method::POST | Method::PUT) {
        to_bytes(req.into_body(), usize::MAX)
            .await
            .map_err(|e| ApiError(Error::invalid_request(format!("failed to read body: {e}"))))?
            .to_vec()
    } else {
        Vec::new()
    };

    match method {
        Method::POST => {
            handle_post(&state, section, &path, &headers, content_type.as_deref(), body).await
        }
        Method::PUT => {
            handle_put(&state, section, &path, &headers, content_type.as_deref(), body).await
        }
        Method::DELETE => handle_delete(&state, section, &path, &headers).await,
        _ => unreachable!("verb filtered above"),
    }
}

async fn handle_get(
    state: &AppState,
    section: &Section,
    path: &str,
) -> Result<Response, ApiError> {
    match path_tail_id(path) {
        Some(id) => {
            let resource = state.store.get(id).await?;
            let resource = apply_response_hooks(section, resource)?;
            resource_response(StatusCode::OK, &resource, true).map_err(ApiError)
        }
        None => {
            let resources = state.store.get_by_path(path).await;
            collection_response(section, resources).map_err(ApiError)
        }
    }
}

async fn handle_post(
    state: &AppState,
    section: &Section,
    path: &str,
    headers: &HeaderMap,
    content_type: Option<&str>,
    body: Vec<u8>,
) -> Result<Response, ApiError> {
    let ids = section.extract_ids(&Method::POST, path, headers, content_type, &body)?;
    if ids.is_empty() {
        return Err(ApiError(Error::invalid_request(
            "no identifier could be extracted from the request",
        )));
    }

    let incoming = Resource {
        storage_id: String::new(),
        path: path.to_string(),
        external_ids: ids,
        location: String::new(),
        content_type: content_type.unwrap_or_default().to_string(),
        body,
    };
    let incoming = apply_request_hooks(section, incoming)?;

    let created = state
        .store
        .create(
            incoming.external_ids,
            ResourceDraft {
                path: incoming.path,
                content_type: incoming.content_type,
                body: incoming.body,
            },
        )
        .await?;

    if section.return_body {
        let created = apply_response_hooks(section, created)?;
        resource_response(StatusCode::CREATED, &created, true).map_err(ApiError)
    } else {
        resource_response(StatusCode::CREATED, &created, false).map_err(ApiError)
    }
}

async fn handle_put(
    state: &AppState,
    section: &Section,
    path: &str,
    headers: &HeaderMap,
    content_type: Option<&str>,
    body: Vec<u8>,
) -> Result<Response, ApiError> {
    let ids = section.extract_ids(&Method::PUT, path, headers, content_type, &body)?;
    // The path ID is authoritative: extraction puts it first when present.
    let Some(target) = ids.first().cloned() else {
        return Err(ApiError(Error::invalid_request(
            "update requires an identifier",
        )));
    };

    // A tail-identified PUT addresses a resource stored under the
    // collection path; keeping the tail would shift the resource's bucket
    // and its location.
    let resource_path = if path_tail_id(path).is_some() {
        collection_path(path)
    } else {
        path
    };

    let incoming = Resource {
        storage_id: String::new(),
        path: resource_path.to_string(),
        external_ids: ids,
        location: String::new(),
        content_type: content_type.unwrap_or_default().to_string(),
        body,
    };
    let incoming = apply_request_hooks(section, incoming)?;

    let updated = state
        .store
        .update(
            &target,
            ResourceDraft {
                path: incoming.path,
                content_type: incoming.content_type,
                body: incoming.body,
            },
        )
        .await?;

    let updated = apply_response_hooks(section, updated)?;
    resource_response(StatusCode::OK, &updated, false).map_err(ApiError)
}

async fn handle_delete(
    state: &AppState,
    section: &Section,
    path: &str,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    let ids = section.extract_ids(&Method::DELETE, path, headers, None, &[])?;
    for id in &ids {
        match state.store.delete(id).await {
            Ok(_) => return Ok(StatusCode::NO_CONTENT.into_response()),
            Err(Error::NotFound { .. }) => continue,
            Err(other) => return Err(ApiError(other)),
        }
    }
    // No extracted ID resolved; fall back to deleting the path subtree.
    state.store.delete(path).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// The path one segment up from a tail-identified resource path.
fn collection_path(path: &str) -> &str {
    let normalized = unimock_core::normalize_path(path);
    match normalized.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &normalized[..idx],
    }
}

/// Render a scenario verbatim: status, content type, location, extra
/// headers, and data, exactly as programmed.
fn scenario_response(scenario: &Scenario) -> Result<Response, Error> {
    let status = StatusCode::from_u16(scenario.status_code).map_err(|_| {
        Error::storage(format!(
            "scenario carries invalid status code {}",
            scenario.status_code
        ))
    })?;
    let mut builder = Response::builder().status(status);
    if let Some(content_type) = &scenario.content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type.as_str());
    }
    if let Some(location) = &scenario.location {
        builder = builder.header(header::LOCATION, location.as_str());
    }
    for (name, value) in &scenario.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Body::from(scenario.data.clone()))
        .map_err(|e| Error::storage(format!("failed to assemble scenario response: {e}")))
}

/// A single-resource response: stored content type, `Location` header, and
/// optionally the stored bytes.
fn resource_response(
    status: StatusCode,
    resource: &Resource,
    include_body: bool,
) -> Result<Response, Error> {
    let mut builder =
        Response::builder().status(status).header(header::LOCATION, resource.location.as_str());
    if include_body && !resource.content_type.is_empty() {
        builder = builder.header(header::CONTENT_TYPE, resource.content_type.as_str());
    }
    let body = if include_body {
        Body::from(resource.body.clone())
    } else {
        Body::empty()
    };
    builder
        .body(body)
        .map_err(|e| Error::storage(format!("failed to assemble response: {e}")))
}

/// A collection response: the raw bodies of JSON-typed resources joined
/// with commas inside `[`…`]`. Bodies are never re-parsed.
fn collection_response(section: &Section, resources: Vec<Resource>) -> Result<Response, Error> {
    let run_hooks = section.transformations.has_response_hooks();
    let mut body = Vec::new();
    body.push(b'[');
    let mut first = true;
    for resource in resources {
        if !resource.content_type.to_ascii_lowercase().contains("json") {
            continue;
        }
        let resource = if run_hooks {
            section
                .transformations
                .apply_response(resource)
                .map_err(|e| Error::storage(format!("response transform failed: {e}")))?
        } else {
            resource
        };
        if !first {
            body.push(b',');
        }
        body.extend_from_slice(&resource.body);
        first = false;
    }
    body.push(b']');

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .map_err(|e| Error::storage(format!("failed to assemble collection response: {e}")))
}

/// Hook failures abort the request as internal errors regardless of the
/// error kind the hook returned.
fn apply_request_hooks(section: &Section, resource: Resource) -> Result<Resource, ApiError> {
    section
        .transformations
        .apply_request(resource)
        .map_err(|e| ApiError(Error::storage(format!("request transform failed: {e}"))))
}

fn apply_response_hooks(section: &Section, resource: Resource) -> Result<Resource, ApiError> {
    if !section.transformations.has_response_hooks() {
        return Ok(resource);
    }
    section
        .transformations
        .apply_response(resource)
        .map_err(|e| ApiError(Error::storage(format!("response transform failed: {e}"))))
}
