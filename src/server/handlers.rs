use std::str::FromStr;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Form, State};
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::Multipart;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use super::page::{Notice, render_page};
use super::{AppState, SESSION_COOKIE};
use crate::error::{AppError, IngestError, UploadError};
use crate::models::{Answer, IngestReport, MAX_UI_CHUNK_SIZE, MIN_UI_CHUNK_SIZE};
use crate::services::{
    ChatClient, EmbeddingClient, TextChunker, VectorStore, ask_and_get_answer, check_api_key,
    create_index, ingest_document, validate_k,
};
use crate::session::{Session, SharedSession, StoredUpload};

const UPLOAD_SUCCESS: &str = "File Uploaded, Chunked and Embedded Successfully.";
const NO_INDEX: &str = "Upload a document before asking questions.";
const KEY_REQUIRED: &str = "Check your API key before adding data.";

fn session_cookie(id: Uuid) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Resolve the caller's session, issuing a cookie when a new one starts.
async fn open_session(state: &AppState, jar: CookieJar) -> (CookieJar, SharedSession) {
    let known = jar
        .get(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok());
    let (id, session) = state.sessions.get_or_create(known).await;
    let jar = if known == Some(id) {
        jar
    } else {
        jar.add(session_cookie(id))
    };
    (jar, session)
}

fn page(jar: CookieJar, session: &Session, notices: &[Notice], answer: Option<&Answer>) -> Response {
    (jar, Html(render_page(session, notices, answer))).into_response()
}

fn user_message(err: &AppError) -> String {
    match err {
        AppError::Ingest(IngestError::UnsupportedFormat(_)) => {
            "Document format not supported! Upload a .pdf, .docx or .txt file.".to_string()
        }
        other => other.to_string(),
    }
}

fn parse_field<T: FromStr>(value: Option<&str>, field: &str, default: T) -> Result<T, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| AppError::InvalidField {
            field: field.to_string(),
            message: format!("'{v}' is not a number"),
        }),
    }
}

pub async fn index(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, shared) = open_session(&state, jar).await;
    let mut session = shared.lock().await;
    session.touch();
    page(jar, &session, &[], None)
}

#[derive(Debug, Deserialize)]
pub struct KeyForm {
    #[serde(default)]
    api_key: String,
}

pub async fn check_key(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<KeyForm>,
) -> Response {
    let (jar, shared) = open_session(&state, jar).await;
    let mut session = shared.lock().await;
    session.touch();

    let outcome = check_api_key(&state.config.llm, &state.config.chat, &form.api_key).await;
    let notice = if outcome.is_valid() {
        session.api_key = Some(form.api_key.trim().to_string());
        Notice::success(outcome.message())
    } else {
        session.api_key = None;
        Notice::error(outcome.message())
    };
    page(jar, &session, &[notice], None)
}

#[derive(Debug, Default)]
struct UploadForm {
    file: Option<(String, Bytes)>,
    chunk_size: Option<String>,
    k: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, UploadError> {
    let mut form = UploadForm::default();
    let malformed = |e: axum_extra::extract::multipart::MultipartError| {
        UploadError::Multipart(e.to_string())
    };

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(malformed)?;
                if !file_name.is_empty() {
                    form.file = Some((file_name, data));
                }
            }
            "chunk_size" => form.chunk_size = Some(field.text().await.map_err(malformed)?),
            "k" => form.k = Some(field.text().await.map_err(malformed)?),
            _ => {}
        }
    }

    Ok(form)
}

async fn index_upload(
    state: &AppState,
    session_id: Uuid,
    upload: &StoredUpload,
    chunk_size: usize,
    api_key: &str,
) -> Result<(Box<dyn VectorStore>, IngestReport), AppError> {
    let chunking = &state.config.chunking;
    let chunker = TextChunker::with_params(chunk_size, chunking.chunk_overlap, chunking.strategy)
        .map_err(IngestError::from)?;
    let embedder = EmbeddingClient::with_key(&state.config.llm, &state.config.embedding, api_key)?;
    let mut index = create_index(&state.config.vector_store, session_id).map_err(IngestError::from)?;

    let result = ingest_document(
        &upload.path,
        &upload.display_name,
        &chunker,
        &state.estimator,
        &embedder,
        index.as_mut(),
    )
    .await;

    match result {
        Ok(report) => Ok((index, report)),
        Err(e) => {
            release(session_id, index.as_ref()).await;
            Err(e.into())
        }
    }
}

async fn release(session_id: Uuid, index: &dyn VectorStore) {
    if let Err(e) = index.destroy().await {
        warn!(session = %session_id, error = %e, "failed to release vector index");
    }
}

async fn run_upload(
    state: &AppState,
    session: &mut Session,
    multipart: Multipart,
) -> Result<Vec<Notice>, AppError> {
    let form = read_upload_form(multipart).await?;

    let chunk_size = parse_field(form.chunk_size.as_deref(), "chunk_size", session.chunk_size)?;
    if !(MIN_UI_CHUNK_SIZE..=MAX_UI_CHUNK_SIZE).contains(&chunk_size) {
        return Err(AppError::InvalidField {
            field: "chunk_size".to_string(),
            message: format!("must be between {MIN_UI_CHUNK_SIZE} and {MAX_UI_CHUNK_SIZE}"),
        });
    }
    let k = validate_k(parse_field(form.k.as_deref(), "k", session.k)?)?;
    session.chunk_size = chunk_size;
    session.k = k;

    let Some(api_key) = session.api_key.clone() else {
        return Err(AppError::Other(KEY_REQUIRED.to_string()));
    };
    let (file_name, bytes) = form.file.ok_or(UploadError::MissingFile)?;

    let upload = state.uploads.save(session.id, &file_name, &bytes).await?;
    let result = index_upload(state, session.id, &upload, chunk_size, &api_key).await;
    state.uploads.discard(&upload).await;
    let (index, report) = result?;

    let notices = vec![
        Notice::info(report.chunk_summary()),
        Notice::info(report.cost.summary()),
        Notice::success(UPLOAD_SUCCESS),
    ];
    if let Some(previous) = session.replace_index(index, report) {
        release(session.id, previous.as_ref()).await;
    }
    Ok(notices)
}

pub async fn upload(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Response {
    let (jar, shared) = open_session(&state, jar).await;
    let mut session = shared.lock().await;
    session.touch();

    let notices = match run_upload(&state, &mut session, multipart).await {
        Ok(notices) => notices,
        Err(e) => {
            warn!(session = %session.id, error = %e, "upload failed");
            vec![Notice::error(user_message(&e))]
        }
    };
    page(jar, &session, &notices, None)
}

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    question: String,
    #[serde(default)]
    k: Option<String>,
}

async fn run_ask(
    state: &AppState,
    session: &mut Session,
    form: AskForm,
) -> Result<(Vec<Notice>, Option<Answer>), AppError> {
    let question = form.question.trim();
    if question.is_empty() {
        return Ok((Vec::new(), None));
    }
    let k = validate_k(parse_field(form.k.as_deref(), "k", session.k)?)?;
    session.k = k;

    let (Some(index), Some(api_key)) = (session.index.as_deref(), session.api_key.as_deref())
    else {
        return Ok((vec![Notice::info(NO_INDEX)], None));
    };

    let embedder = EmbeddingClient::with_key(&state.config.llm, &state.config.embedding, api_key)?;
    let chat = ChatClient::with_key(&state.config.llm, &state.config.chat, api_key)?;
    let answer = ask_and_get_answer(index, &embedder, &chat, question, k).await?;

    session.history.push(answer.question.clone(), answer.text.clone());
    Ok((Vec::new(), Some(answer)))
}

pub async fn ask(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<AskForm>,
) -> Response {
    let (jar, shared) = open_session(&state, jar).await;
    let mut session = shared.lock().await;
    session.touch();

    match run_ask(&state, &mut session, form).await {
        Ok((notices, answer)) => page(jar, &session, &notices, answer.as_ref()),
        Err(e) => {
            warn!(session = %session.id, error = %e, "question failed");
            page(jar, &session, &[Notice::error(user_message(&e))], None)
        }
    }
}

pub async fn clear_history(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, shared) = open_session(&state, jar).await;
    let mut session = shared.lock().await;
    session.touch();
    session.clear_history();
    page(jar, &session, &[Notice::info("Chat history cleared.")], None)
}

pub async fn reset(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, shared) = open_session(&state, jar).await;
    let mut session = shared.lock().await;
    session.touch();
    session.reset().await;
    info!(session = %session.id, "session reset");
    page(jar, &session, &[Notice::info("Index and chat history cleared.")], None)
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.len().await,
        "started_at": state.started_at.to_rfc3339(),
        "uptime_secs": (chrono::Utc::now() - state.started_at).num_seconds(),
    }))
}
