use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Condition, web::Data, App, HttpServer};
use log::{error, info};
use sqlx::postgres::PgPoolOptions;
use utoipa_rapidoc::RapiDoc;

use langchat_auth::{
    apidocs,
    auth::{self, CredentialVerifier, SessionManager, UserDirectory},
    crypto,
    db::Database,
    options,
    store::{memory::spawn_sweeper, MemorySessionStore, SessionStore},
};

/// `langchat-auth encrypt <password>` prints the value to store in `users.password`
fn run_encrypt(plaintext: &str) -> std::io::Result<()> {
    lazy_static::initialize(&options::AUTH_SECRET_KEY);

    match crypto::encrypt(&options::AUTH_SECRET_KEY, plaintext) {
        Ok(sealed) => {
            println!("{}", sealed);
            Ok(())
        }
        Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e)),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if let [_, command, plaintext] = args.as_slice() {
        if command == "encrypt" {
            return run_encrypt(plaintext);
        }
    }

    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    options::initialize_all();
    options::print_all();

    // database
    let db_url = options::db_conn_string();
    let pool = PgPoolOptions::new()
        .max_connections(*options::DB_POOL_MAX_CONNS)
        .connect(&db_url);

    let pool = match pool.await {
        Ok(pool) => {
            info!("Connected to database successfully!");
            pool
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    let db = Arc::new(Database::with_pool(pool));

    if *options::DB_RUN_MIGRATIONS {
        if let Err(e) = db.run_migrations().await {
            error!("Failed to run database migrations: {}", e);
            std::process::exit(1);
        }
        info!("Database migrations applied");
    }

    // session registry
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    spawn_sweeper(Arc::clone(&store), options::sweep_interval());

    let session_manager = Data::new(SessionManager::new(
        Arc::clone(&store),
        options::session_settings(),
    ));

    let directory: Arc<dyn UserDirectory> = db;
    let verifier = Data::new(CredentialVerifier::new(directory, *options::AUTH_SECRET_KEY));

    let oapi = apidocs::setup_oapi();

    let app = move || {
        App::new()
            .wrap(Condition::new(*options::HANDLE_CORS, Cors::permissive()))
            // add logging middleware
            .wrap(actix_web::middleware::Logger::new("%{r}a %r -> %s in %Dms").log_target("http"))
            .app_data(Data::clone(&session_manager))
            .app_data(Data::clone(&verifier))
            .configure(auth::routes::configure_app)
            .service(RapiDoc::with_openapi("/docs/openapi.json", oapi.clone()).path("/docs"))
    };

    let mut server = HttpServer::new(app).workers(*options::NUM_WEB_WORKERS);

    if !*options::SSL_ONLY {
        server = server.bind(options::bind_addr())?;
    }

    if *options::SSL_ENABLE {
        server = server.bind_rustls_021(options::ssl_bind_addr(), options::ssl_config()?)?;
    }

    server.run().await
}
