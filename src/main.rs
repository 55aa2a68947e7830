use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, middleware, Responder};
use actix_cors::Cors;
use grade_genie::api::{configure_routes, AppState};
use grade_genie::{banner, config};
use grade_genie::providers::Provider;
use rust_embed::RustEmbed;
use std::borrow::Cow;

#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticAssets;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    banner::print_banner();

    if let Err(e) = dotenvy::dotenv() {
        eprintln!("⚠️  Warning: Could not load .env file: {}", e);
        eprintln!("   Make sure GEMINI_API_KEY (or another provider) is set in your environment");
    }

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let app_config = config::AppConfig::from_env()
        .expect("Failed to load app configuration from environment");
    let bind = (app_config.server.host.clone(), app_config.server.port);

    log::info!("🧠 Grading with model {}", app_config.grading.model);

    let state = AppState::new(app_config)
        .expect("Failed to initialise the grading provider");

    log::info!("🚀 Starting server on http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(configure_routes::<Provider>)
            .route("/{_:.*}", web::get().to(static_file_handler))
    })
    .bind(bind)?
    .run()
    .await
}

async fn static_file_handler(req: HttpRequest) -> impl Responder {
    let path = if req.path() == "/" {
        "index.html"
    } else {
        // trim leading '/'
        &req.path()[1..]
    };

    match StaticAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            HttpResponse::Ok().content_type(mime.as_ref()).body(Cow::into_owned(content.data))
        }
        None => HttpResponse::NotFound().body("404 Not Found"),
    }
}
