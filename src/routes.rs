use crate::{
    api::{attendance, breaks, reports, sync_ops},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let breaks_limiter = Arc::new(build_limiter(config.rate_breaks_per_min));
    let query_limiter = Arc::new(build_limiter(config.rate_query_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/breaks")
                    .wrap(breaks_limiter)
                    // /breaks/start, /breaks/end
                    .service(web::resource("/start").route(web::post().to(breaks::start_break)))
                    .service(web::resource("/end").route(web::post().to(breaks::end_break)))
                    // /breaks/status/{employee_id}
                    .service(
                        web::resource("/status/{employee_id}")
                            .route(web::get().to(breaks::break_status)),
                    )
                    // /breaks/history/{employee_id}
                    .service(
                        web::resource("/history/{employee_id}")
                            .route(web::get().to(breaks::break_history)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .wrap(query_limiter.clone())
                    // /attendance
                    .service(web::resource("").route(web::get().to(attendance::list_attendance))),
            )
            .service(
                web::scope("/reports")
                    .wrap(query_limiter.clone())
                    // /reports/daily
                    .service(web::resource("/daily").route(web::get().to(reports::daily_report))),
            )
            .service(
                web::scope("/sync")
                    .wrap(query_limiter)
                    // /sync/status
                    .service(web::resource("/status").route(web::get().to(sync_ops::sync_status)))
                    // /sync/failures
                    .service(
                        web::resource("/failures").route(web::get().to(sync_ops::sync_failures)),
                    )
                    // /sync/facilities/{facility_id}
                    .service(
                        web::resource("/facilities/{facility_id}")
                            .route(web::post().to(sync_ops::trigger_facility_sync)),
                    ),
            ),
    );
}
