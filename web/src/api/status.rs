use std::sync::atomic::Ordering;
use std::sync::{Arc, RwLock};

use actix_web::{get, web, HttpResponse, Responder};
use master::fanout::SlaveFanout;
use master::instance::MasterInstance;
use serde::Serialize;

/// Router state the admin surface reports on: current master connection and
/// the slaves currently being fanned out to, spec.md §7E.
pub struct RouterStatusState {
    pub master: MasterInstance,
    pub fanout: Arc<SlaveFanout>,
}

pub type SharedRouterStatus = Arc<RwLock<RouterStatusState>>;

#[derive(Serialize)]
struct StatusResponse {
    state: String,
    current_file: String,
    current_pos: u64,
    events_last_30m: u64,
    n_badcrc: u64,
}

#[derive(Serialize)]
struct SlaveRow {
    server_id: u32,
    role: String,
    file: String,
    pos: u64,
}

/// http://127.0.0.1:8080/status
#[get("/status")]
async fn status(state: web::Data<SharedRouterStatus>) -> impl Responder {
    let guard = state.read().unwrap();
    HttpResponse::Ok().json(StatusResponse {
        state: format!("{:?}", guard.master.state),
        current_file: guard.master.current_file.clone(),
        current_pos: guard.master.current_pos,
        events_last_30m: guard.master.stats.total_events(),
        n_badcrc: guard.master.n_badcrc.load(Ordering::Relaxed),
    })
}

/// http://127.0.0.1:8080/status/slaves
#[get("/status/slaves")]
async fn slaves(state: web::Data<SharedRouterStatus>) -> impl Responder {
    let guard = state.read().unwrap();
    let rows: Vec<SlaveRow> = guard
        .fanout
        .snapshot()
        .into_iter()
        .map(|(server_id, cursor)| SlaveRow {
            server_id,
            role: format!("{:?}", cursor.role),
            file: cursor.file,
            pos: cursor.pos,
        })
        .collect();
    HttpResponse::Ok().json(rows)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(status).service(slaves);
}
