use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use tracing::{error, info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use veil::config::Settings;
use veil::openapi::ApiDoc;
use veil::password::build_hasher;
use veil::routes::{config, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env automatically only in debug builds; production sets the environment externally.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    info!("Bootstrapping veil moderation server");
    info!("Frontend URL: {}", settings.frontend_url);

    let hasher = build_hasher(settings.bcrypt_cost);

    #[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
    let state = {
        info!("Using in-memory repository backend (snapshot dir '{}')", settings.data_dir.display());
        AppState::new(Arc::new(veil::repo::inmem::InMemRepo::new(&settings.data_dir)), hasher)
    };

    #[cfg(feature = "postgres-store")]
    let state = {
        use sqlx::postgres::PgPoolOptions;
        let db_url = settings.database_url.clone().unwrap_or_default();
        let pool = match PgPoolOptions::new().max_connections(5).connect(&db_url).await {
            Ok(pool) => pool,
            Err(e) => {
                error!("failed to connect to Postgres: {e}");
                std::process::exit(1);
            }
        };
        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            error!("migrations failed: {e}");
            std::process::exit(1);
        }
        info!("Using Postgres repository backend");
        AppState::new(Arc::new(veil::repo::pg::PgRepo::new(pool)), hasher)
    };

    let openapi = ApiDoc::openapi();
    let frontend_url = settings.frontend_url.clone();

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            // local dev frontends
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://127.0.0.1:5173")
            .allowed_origin(&frontend_url)
            .allow_any_header()
            .allowed_methods(["GET", "POST", "DELETE", "OPTIONS"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind((settings.bind_addr.as_str(), settings.port))?;

    info!("Listening on http://{}:{}", settings.bind_addr, settings.port);

    server.run().await
}
