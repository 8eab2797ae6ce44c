use axum::{
    Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State, multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info};
use uuid::Uuid;

use crate::{
    analysis::ReportAnalyzer,
    chat::ChatResponder,
    config::Config,
    error::{ApiResult, AppError},
    extract::extract_text,
    llm::{GeminiClient, HuggingFaceCaptioner, ImageCaptioner, TogetherChat},
    models::{
        ChatRequest, ChatResponse, MedicalReport, NewMedicalReport, ReportAnalysis,
        ReportSummary, UpdateReportRequest,
    },
    scratch::ScratchImage,
    storage::{InMemoryReportStore, PostgresReportStore, ReportStore},
};

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

const MISSING_REPORT_FILE: &str = "Please provide a pdf file.";
const MISSING_IMAGE: &str = "No image or text provided";

#[derive(Clone)]
pub struct AppState {
    pub analyzer: ReportAnalyzer,
    pub responder: ChatResponder,
    pub captioner: Arc<dyn ImageCaptioner>,
    pub reports: Arc<dyn ReportStore>,
    pub scratch_dir: PathBuf,
}

pub async fn create_app(config: &Config) -> Router {
    let app_state = create_app_state(config).await;
    build_router(app_state).layer(DefaultBodyLimit::max(config.max_upload_bytes))
}

async fn create_app_state(config: &Config) -> AppState {
    let http = reqwest::Client::new();
    let timeout = config.model_timeout;

    let gemini = Arc::new(GeminiClient::new(
        http.clone(),
        &config.gemini_base_url,
        &config.gemini_api_key,
        timeout,
    ));
    let together = Arc::new(TogetherChat::new(&config.together_api_key, timeout));
    let captioner = Arc::new(HuggingFaceCaptioner::new(
        http,
        &config.hf_base_url,
        &config.hf_token,
        timeout,
    ));

    AppState {
        analyzer: ReportAnalyzer::new(gemini.clone()),
        responder: ChatResponder::new(together, gemini),
        captioner,
        reports: create_report_store(config.database_url.as_deref()).await,
        scratch_dir: config.scratch_dir.clone(),
    }
}

async fn create_report_store(database_url: Option<&str>) -> Arc<dyn ReportStore> {
    let Some(database_url) = database_url else {
        info!("Using in-memory report storage (set DATABASE_URL to use PostgreSQL)");
        return Arc::new(InMemoryReportStore::new());
    };

    info!("Using PostgreSQL report storage");
    match PostgresReportStore::connect(database_url).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(
                "Failed to connect to PostgreSQL: {}. Falling back to in-memory storage.",
                e
            );
            Arc::new(InMemoryReportStore::new())
        }
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/report", post(analyze_report))
        .route("/chatbot", post(chatbot))
        .route("/chatbot-img", post(image_chatbot))
        .route("/reports", get(list_reports))
        .route("/reports/create", post(create_report))
        .route("/reports/{id}", get(get_report).put(update_report))
        .route("/reports/caretaker/{caretaker_id}", get(reports_by_caretaker))
        .route("/reports/doctor/{doctor_id}", get(reports_by_doctor))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlation_id_middleware))
        .with_state(app_state)
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();
    let header = HeaderValue::from_str(&correlation_id).ok();

    if let Some(value) = &header {
        request
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, value.clone());
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Care Assistant Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Medical report analysis and conversational assistance for elderly care",
        "endpoints": {
            "POST /report": "Analyze an uploaded medical report (multipart field `file`)",
            "POST /chatbot": "Answer a medical question ({\"query\": string, \"history\"?: [...]})",
            "POST /chatbot-img": "Answer based on an uploaded image (multipart field `image`)",
            "POST /reports/create": "Store a medical report",
            "GET /reports": "List medical reports",
            "GET /reports/{id}": "Get a medical report",
            "PUT /reports/{id}": "Update a report's verification flag",
            "GET /reports/caretaker/{caretakerId}": "List reports submitted by a caretaker",
            "GET /reports/doctor/{doctorId}": "List reports assigned to a doctor",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// Reads the named file part. Missing or empty parts yield `None`.
async fn read_file_field(multipart: &mut Multipart, name: &str) -> ApiResult<Option<Upload>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(name) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        if bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(Upload {
            filename,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

async fn analyze_report(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ReportAnalysis>> {
    let missing_file = || AppError::BadRequest(MISSING_REPORT_FILE.to_string());

    let mut multipart = multipart.map_err(|_| missing_file())?;
    let upload = read_file_field(&mut multipart, "file")
        .await?
        .ok_or_else(missing_file)?;

    info!(
        filename = %upload.filename,
        size = upload.bytes.len(),
        "Received medical report upload"
    );

    let report_text = extract_text(&upload.filename, upload.bytes).await?;
    let analysis = state.analyzer.analyze(&report_text).await?;

    info!(
        precautions = analysis.precautions.len(),
        predictions = analysis.predictions.len(),
        "Medical report analysis completed"
    );
    Ok(Json(analysis))
}

async fn chatbot(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    if request.query.trim().is_empty() {
        return Err(AppError::BadRequest("Query cannot be empty".to_string()));
    }

    let response = state
        .responder
        .respond(&request.query, &request.history)
        .await
        .map_err(|e| AppError::model("Error generating response", e))?;

    Ok(Json(ChatResponse { response }))
}

async fn image_chatbot(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let no_input = || AppError::BadRequest(MISSING_IMAGE.to_string());

    let mut multipart = multipart.map_err(|_| no_input())?;
    let upload = read_file_field(&mut multipart, "image")
        .await?
        .ok_or_else(no_input)?;

    let caption = caption_upload(&state, upload).await?;
    if caption.is_empty() {
        return Err(no_input());
    }

    let response = state
        .responder
        .respond_to_caption(&caption)
        .await
        .map_err(|e| AppError::model("Error generating response", e))?;

    Ok(Json(ChatResponse { response }))
}

/// Stores the upload in a scratch file only for as long as captioning runs.
async fn caption_upload(state: &AppState, upload: Upload) -> ApiResult<String> {
    if image::guess_format(&upload.bytes).is_err() {
        return Err(AppError::BadRequest("Unsupported image format".to_string()));
    }

    info!(
        filename = %upload.filename,
        size = upload.bytes.len(),
        "Received image upload"
    );

    let scratch = ScratchImage::create(&state.scratch_dir, &upload.filename, upload.bytes)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store uploaded image: {e}")))?;

    state
        .captioner
        .caption(scratch.path())
        .await
        .map_err(|e| AppError::model("Error generating caption", e))
}

fn parse_id(raw: &str, message: &str) -> ApiResult<i32> {
    raw.parse::<i32>()
        .map_err(|_| AppError::BadRequest(message.to_string()))
}

async fn create_report(
    State(state): State<AppState>,
    payload: Result<Json<NewMedicalReport>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(report) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    report.validate().map_err(AppError::Validation)?;

    let report = state.reports.create(report).await?;
    info!(report_id = report.id, patient_id = report.patient_id, "Report created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Report created successfully",
            "report": report
        })),
    ))
}

async fn list_reports(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let reports: Vec<MedicalReport> = state.reports.list().await?;
    Ok(Json(json!({
        "message": "Reports retrieved successfully",
        "reports": reports
    })))
}

async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Invalid ID format")?;
    let report = state
        .reports
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;

    Ok(Json(json!({
        "message": "Report retrieved successfully",
        "report": report
    })))
}

async fn update_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateReportRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Invalid ID format")?;
    let Json(update) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let report = state
        .reports
        .set_verified(id, update.verified)
        .await?
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;
    info!(report_id = id, verified = update.verified, "Report updated");

    Ok(Json(json!({
        "message": "Report updated successfully",
        "report": report
    })))
}

async fn reports_by_caretaker(
    State(state): State<AppState>,
    Path(caretaker_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let caretaker_id = parse_id(&caretaker_id, "Invalid caretaker ID format")?;
    let reports: Vec<ReportSummary> = state.reports.list_by_caretaker(caretaker_id).await?;
    Ok(Json(json!({
        "message": "Reports retrieved successfully",
        "reports": reports
    })))
}

async fn reports_by_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let doctor_id = parse_id(&doctor_id, "Invalid doctor ID format")?;
    let reports: Vec<ReportSummary> = state.reports.list_by_doctor(doctor_id).await?;
    Ok(Json(json!({
        "message": "Reports retrieved successfully",
        "reports": reports
    })))
}

