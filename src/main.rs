use std::io;
use std::sync::Arc;

use actix_files as fs;
use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use dotenv::dotenv;
use log::{error, info};

use classtyper::cmd::{self, Cli, Command};
use classtyper::config::ServerConfig;
use classtyper::db::SqliteStore;
use classtyper::http;
use classtyper::store::Stores;

const DEFAULT_LOG_FILTER: &str = "info,actix_server=info,actix_web=info";

async fn serve(config: ServerConfig, store: Arc<SqliteStore>) -> io::Result<()> {
    let heartbeat = config.heartbeat().map_err(io::Error::other)?;
    let stores = Stores::from_shared(store);
    let static_dir = config.static_dir.clone();
    if !static_dir.is_dir() {
        info!("{} not found, serving the API only", static_dir.display());
    }

    info!("listening on {}", config.bind_address);
    HttpServer::new(move || {
        let app = App::new()
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(stores.clone()))
            .app_data(web::Data::new(heartbeat))
            .configure(http::configure);
        if static_dir.is_dir() {
            app.service(fs::Files::new("/", &static_dir).index_file("index.html"))
        } else {
            app
        }
    })
    .bind(&config.bind_address)?
    .run()
    .await
}

#[actix_rt::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_LOG_FILTER))
        .init();

    let cli = Cli::parse();

    let store = match SqliteStore::open(&cli.config.database_url, cli.config.db_pool_size) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("could not open {}: {}", cli.config.database_url, e);
            return Err(io::Error::other(e));
        }
    };

    let command = cli.command.unwrap_or(Command::Serve);
    match cmd::run(&command, store.as_ref()) {
        Ok(true) => Ok(()),
        Ok(false) => serve(cli.config, store).await,
        Err(e) => {
            error!("{}", e);
            Err(io::Error::other(e))
        }
    }
}
