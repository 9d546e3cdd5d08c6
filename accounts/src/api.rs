use crate::errors::AccountError;
use crate::oauth::OAuthClient;
use crate::store::AccountStore;
use crate::types::{Account, NewAccount};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct ApiState {
    pub oauth: OAuthClient,
    pub store: AccountStore,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .with_state(state)
}

#[derive(Serialize)]
struct LoginResponse {
    auth_url: String,
}

#[derive(Deserialize, Debug)]
struct CallbackParams {
    code: String,
}

#[derive(Serialize)]
struct CallbackResponse {
    message: &'static str,
    account: Account,
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error_message: String,
}

async fn login(State(state): State<ApiState>) -> Json<LoginResponse> {
    Json(LoginResponse {
        auth_url: state.oauth.authorize_url(),
    })
}

/// Complete the login: trade the code for tokens, resolve the profile they
/// belong to, and persist the account.
async fn callback(
    State(state): State<ApiState>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<CallbackResponse>, AccountError> {
    let tokens = state.oauth.exchange_code(&params.code).await?;
    let profile = state.oauth.fetch_profile(&tokens.access_token).await?;

    let account = state
        .store
        .upsert(NewAccount {
            external_id: profile.external_id,
            login: profile.login,
            display_name: profile.display_name,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
        .await?;

    tracing::info!(account_id = account.id, login = %account.login, "account connected");

    Ok(Json(CallbackResponse {
        message: "account connected",
        account,
    }))
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = match self {
            AccountError::Exchange { .. }
            | AccountError::Profile { .. }
            | AccountError::MissingField(_) => StatusCode::BAD_REQUEST,
            AccountError::Transport(_) | AccountError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ApiErrorResponse {
            error_message: self.to_string(),
        });

        (status, body).into_response()
    }
}
