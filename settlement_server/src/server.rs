use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, error::Error, http::KeepAlive, middleware::Logger, web, App, HttpRequest, HttpServer};
use log::*;
use settlement_engine::{
    events::{EventHandlers, EventProducers},
    gateway::VnPayGateway,
    side_effects::{hooks::SideEffects, BroadcastHub, PushNotifier},
    OrderFlowApi,
    PaymentFlowApi,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    push_transport::LoggingPushTransport,
    routes::{
        health,
        AvailableVouchersRoute,
        CreateOrderRoute,
        CreatePaymentRoute,
        OrderByIdRoute,
        PaymentsForOrderRoute,
        RegisterPushTokenRoute,
        RemovePushTokenRoute,
        SearchOrdersRoute,
        UpdateOrderStatusRoute,
        VnpayIpnRoute,
        VnpayReturnRoute,
    },
};

pub type ServerNotifier = PushNotifier<SqliteDatabase, LoggingPushTransport>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let notifier = Arc::new(PushNotifier::new(db.clone(), LoggingPushTransport, config.push_token_cache_ttl));
    let hub = BroadcastHub::new(config.event_buffer_size);
    let effects = SideEffects::new(Arc::new(db.clone()), Arc::clone(&notifier), Arc::new(hub));
    let handlers = EventHandlers::new(config.event_buffer_size, effects.into_event_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    match config.payment_expiry_grace {
        Some(grace) => {
            let gateway = VnPayGateway::new(config.vnpay.clone());
            let _worker = start_expiry_worker(db.clone(), gateway, producers.clone(), grace);
        },
        None => info!("🕰️ Payment expiry worker is disabled"),
    }
    let srv = create_server_instance(config, db, producers, notifier)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    notifier: Arc<ServerNotifier>,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let gateway = VnPayGateway::new(config.vnpay.clone());
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let payments_api = PaymentFlowApi::new(db.clone(), gateway.clone(), producers.clone());
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(SearchOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(CreatePaymentRoute::<SqliteDatabase>::new())
            .service(VnpayReturnRoute::<SqliteDatabase>::new())
            .service(VnpayIpnRoute::<SqliteDatabase>::new())
            .service(PaymentsForOrderRoute::<SqliteDatabase>::new())
            .service(AvailableVouchersRoute::<SqliteDatabase>::new())
            .service(RegisterPushTokenRoute::<SqliteDatabase, LoggingPushTransport>::new())
            .service(RemovePushTokenRoute::<SqliteDatabase, LoggingPushTransport>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sps::access_log"))
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::from(Arc::clone(&notifier)))
            .app_data(web::Data::new(options))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Malformed bodies, query strings and paths are reported in the same JSON shape as every other error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|e, _req: &HttpRequest| -> Error {
        debug!("💻️ Rejected request body. {e}");
        ServerError::InvalidRequestBody(e.to_string()).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|e, _req: &HttpRequest| -> Error {
        debug!("💻️ Rejected query string. {e}");
        ServerError::InvalidRequestBody(e.to_string()).into()
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|e, _req: &HttpRequest| -> Error {
        ServerError::InvalidRequestPath(e.to_string()).into()
    })
}
