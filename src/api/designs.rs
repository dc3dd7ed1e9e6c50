use axum::{
    extract::{Request, State},
    http::Method,
    Json,
};
use serde_json::json;

use crate::api::{read_form, require_method, AppState, DesignIdSegment, Envelope, Identity};
use crate::design::{Design, DesignStore, NewDesign};
use crate::error::{ApiError, ApiResult};
use crate::forms::{validate_save, SaveFields};

/// Load a design the requesting user owns.
pub(crate) async fn load_owned_design(
    store: &dyn DesignStore,
    identity: &Identity,
    id: u64,
) -> ApiResult<Design> {
    let design = store.get(id).await?.ok_or(ApiError::DesignNotFound(id))?;
    if !design.is_owned_by(identity.user()) {
        return Err(ApiError::Forbidden {
            id,
            user: identity.user().to_string(),
        });
    }
    Ok(design)
}

pub async fn save_new(
    State(state): State<AppState>,
    identity: Identity,
    request: Request,
) -> ApiResult<Json<Envelope>> {
    save_query(state, identity, None, request).await
}

pub async fn save_design(
    State(state): State<AppState>,
    identity: Identity,
    design_id: DesignIdSegment,
    request: Request,
) -> ApiResult<Json<Envelope>> {
    save_query(state, identity, Some(design_id), request).await
}

async fn save_query(
    state: AppState,
    identity: Identity,
    design_id: Option<DesignIdSegment>,
    request: Request,
) -> ApiResult<Json<Envelope>> {
    require_method(request.method(), Method::POST)?;

    let existing = match design_id {
        Some(id) => {
            let id = id.parse()?;
            Some(load_owned_design(state.designs.as_ref(), &identity, id).await?)
        }
        None => None,
    };
    let fields: SaveFields = read_form(request).await?;

    let mut response = Envelope::failure();
    let app_names = state.api_for(&identity).jars().await?;

    let save = match validate_save(&fields, &app_names) {
        Ok(save) => save,
        Err(errors) => {
            response.message = errors.to_string();
            return Ok(Json(response));
        }
    };

    let data = save.query.to_spark_design().encode();
    let design = match existing {
        Some(mut design) if !save.save_as => {
            design.name = save.name;
            design.desc = save.desc;
            design.data = data;
            design.is_auto = false;
            state.designs.update(design).await?
        }
        _ => {
            state
                .designs
                .create(NewDesign {
                    owner: identity.user().to_string(),
                    name: save.name,
                    desc: save.desc,
                    is_auto: false,
                    data,
                })
                .await?
        }
    };

    tracing::info!(
        user = identity.user(),
        design_id = design.id,
        name = %design.name,
        "Saved design"
    );

    response.succeed();
    response.insert("design_id", json!(design.id));
    Ok(Json(response))
}

pub async fn fetch_saved_query(
    State(state): State<AppState>,
    identity: Identity,
    method: Method,
    design_id: DesignIdSegment,
) -> ApiResult<Json<Envelope>> {
    require_method(&method, Method::GET)?;

    let design_id = design_id.parse()?;
    let design = load_owned_design(state.designs.as_ref(), &identity, design_id).await?;

    // The editor only reads `design`; `status` keeps its initial value.
    let mut response = Envelope::failure();
    response.insert("design", json!(design.to_view()?));
    Ok(Json(response))
}
