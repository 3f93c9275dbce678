use crate::classifier::classify;
use crate::config::ServiceConfig;
use crate::error::ApiError;
use crate::preprocess::{decode_image, prepare_image};
use crate::state::AppState;
use crate::upload::read_file_field;
use crate::video::{TempVideo, predict_video as classify_video};
use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, HttpServer, get, post, web};
use serde_json::json;
use std::io::Write;

#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Welcome to the Driver Attention Detection API!"
    }))
}

#[get("/health")]
pub async fn health(_req: HttpRequest) -> HttpResponse {
    HttpResponse::Ok().body("Ok")
}

#[post("/predict")]
pub async fn predict(
    req: HttpRequest,
    payload: Multipart,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let upload = read_file_field(&req, payload, app_state.max_upload_bytes).await?;
    let filename = upload.filename.clone();
    let classifier = app_state.classifier.clone();
    let order = app_state.channel_order;

    let prediction = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let image = decode_image(&upload.data)?;
        let tensor = prepare_image(&image, order);
        classify(classifier.as_ref(), &tensor).map_err(ApiError::Inference)
    })
    .await??;

    log::info!(
        "Predicted {} ({:.4}) for image {:?}",
        prediction.label,
        prediction.confidence,
        filename
    );
    Ok(HttpResponse::Ok().json(json!({
        "prediction": prediction.label,
        "confidence": prediction.confidence,
    })))
}

#[post("/predict_video")]
pub async fn predict_video(
    req: HttpRequest,
    payload: Multipart,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let upload = read_file_field(&req, payload, app_state.max_upload_bytes).await?;
    let filename = upload.filename.clone();
    let state = app_state.get_ref().clone();

    let result = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let video = TempVideo::write(&upload.data, state.temp_dir.as_deref())?;
        let result = classify_video(
            state.video_source.as_ref(),
            &video,
            state.frame_classifier.as_ref(),
            state.channel_order,
        );
        drop(video);
        result.map_err(ApiError::from)
    })
    .await??;

    log::info!("Predicted {} for video {:?}", result.prediction, filename);
    Ok(HttpResponse::Ok().json(result))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(health)
        .service(predict)
        .service(predict_video);
}

pub fn init_logging(level: log::LevelFilter) {
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .init();
}

pub async fn startup(config: ServiceConfig, app_state: AppState) -> std::io::Result<()> {
    let app_state = web::Data::new(app_state);

    log::info!("Starting server at {}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        actix_web::App::new()
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(configure)
    })
    .bind((config.host, config.port))?
    .run()
    .await?;

    std::io::Result::Ok(())
}
