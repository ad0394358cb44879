mod api;
mod config;
mod web_error;

use actix_web::{web, App, HttpServer, middleware};
use actix_files::Files;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use master::fanout::SlaveFanout;
use master::instance::MasterInstance;

use crate::api::default::{data, index, favicon, get_static_dir};
use crate::api::status::{configure as configure_status, RouterStatusState, SharedRouterStatus};
use crate::config::constant::CFG;

// #[actix_web::main]
#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = CFG.get("ADDRESS").unwrap();
    let port = CFG.get("PORT").unwrap();

    log::info!("{}", format!("starting HTTP server at http://{}:{}", &host, &port));

    // Placeholder router state until the binlog router and this process
    // share a connection; the binlog router updates this in place once wired
    // in (spec.md §7E admin surface).
    let router_status: SharedRouterStatus = Arc::new(RwLock::new(RouterStatusState {
        master: MasterInstance::new(String::new(), 4, Duration::from_secs(60)),
        fanout: Arc::new(SlaveFanout::new()),
    }));

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(router_status.clone()))
            // 将"/static"前缀映射到"./static"目录
            // 作为服务（service）被添加到应用中，而不是通过 .wrap() 方法。这是因为 Files 是一个完整的服务，它处理以 /static 开头的所有请求，并将它们映射到文件系统的 ./static 目录中
            .service(Files::new("/static", format!("{}/static", get_static_dir())))
            // .route("/", HttpMethod::Get, |_| HttpResponse::Ok().body("Hello, Rust Web!"))
            .service(index)
            .service(data)
            .service(web::resource("/favicon").to(favicon))
            .configure(configure_status)
            // enable logger
            .wrap(middleware::Logger::default())
    })
        .workers(2)
        .bind(format!("{}:{}", host, port))?
        .run()
        .await
}

#[cfg(test)]
mod test {
    #[test]
    fn test() {
        assert_eq!(1, 1);
        println!("binlog lib test:{}", 0x21);
    }
}
