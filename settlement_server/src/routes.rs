//! Request handler definitions
//!
//! Define each route and its handler here. Handlers stay thin: parse the request, call the engine API, shape the
//! response. Anything longer belongs in the engine.
//!
//! Every handler is async and only awaits the engine, so a worker thread is never blocked by a slow query or a slow
//! gateway callback.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use settlement_engine::{
    db_types::NewOrder,
    gateway::GatewayParams,
    payment_objects::{CallbackSource, IpnResponse},
    side_effects::{PushNotifier, PushTokenStore, PushTransport},
    OrderFlowApi,
    OrderManagement,
    PaymentFlowApi,
    PaymentGatewayDatabase,
};

use crate::{
    config::ServerOptions,
    data_objects::{CreatePaymentParams, JsonResponse, OrderSearchParams, PushTokenParams, UpdateStatusParams},
    errors::ServerError,
    helpers::client_ip,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

/// The store capabilities the payment routes need.
pub trait PaymentBackend: OrderManagement + PaymentGatewayDatabase {}

impl<T> PaymentBackend for T where T: OrderManagement + PaymentGatewayDatabase {}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl OrderManagement);
/// Places an order. The body is a [`NewOrder`]; `total` must match what the server computes from current catalog
/// prices and the voucher.
pub async fn create_order<B: OrderManagement>(
    api: web::Data<OrderFlowApi<B>>,
    body: web::Json<NewOrder>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received new order request");
    let order = api.create_order(body.into_inner()).await?;
    debug!("💻️ Order #{} created", order.order.id);
    Ok(HttpResponse::Created().json(order))
}

route!(search_orders => Get "/orders" impl OrderManagement);
pub async fn search_orders<B: OrderManagement>(
    api: web::Data<OrderFlowApi<B>>,
    query: web::Query<OrderSearchParams>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received order search request: {query:?}");
    let pagination = query.pagination()?;
    let page = api.search_orders(query.filter(), pagination).await?;
    Ok(HttpResponse::Ok().json(page))
}

route!(order_by_id => Get "/orders/{id}" impl OrderManagement);
pub async fn order_by_id<B: OrderManagement>(
    api: web::Data<OrderFlowApi<B>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ Received request for order #{id}");
    let order = api.fetch_order(id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Patch "/orders/{id}/status" impl OrderManagement);
pub async fn update_order_status<B: OrderManagement>(
    api: web::Data<OrderFlowApi<B>>,
    path: web::Path<i64>,
    body: web::Json<UpdateStatusParams>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let status = body.into_inner().status;
    trace!("💻️ Received request to move order #{id} to {status}");
    let change = api.update_status(id, status).await?;
    Ok(HttpResponse::Ok().json(change))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(create_payment => Post "/payments/create" impl PaymentBackend);
/// Creates a pending payment and returns the signed gateway URL the payer must be redirected to.
pub async fn create_payment<B: PaymentBackend>(
    req: HttpRequest,
    api: web::Data<PaymentFlowApi<B>>,
    options: web::Data<ServerOptions>,
    body: web::Json<CreatePaymentParams>,
) -> Result<HttpResponse, ServerError> {
    let ip = client_ip(&req, &options);
    trace!("💻️ Received payment request for order #{} from {ip}", body.order_id);
    let redirect = api.create_payment_request(body.into_inner().into_request(ip)).await?;
    Ok(HttpResponse::Ok().json(redirect))
}

route!(vnpay_return => Get "/payments/vnpay-return" impl PaymentBackend);
/// The payer's browser lands here after leaving the gateway. Responds with the reconciliation result.
pub async fn vnpay_return<B: PaymentBackend>(
    api: web::Data<PaymentFlowApi<B>>,
    query: web::Query<GatewayParams>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received return URL callback for {:?}", query.get("vnp_TxnRef"));
    let result = api.apply_callback(query.into_inner(), CallbackSource::ReturnUrl).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(vnpay_ipn => Get "/payments/vnpay-ipn" impl PaymentBackend);
/// The gateway's server-to-server notification. The gateway only understands its own acknowledgement codes, so this
/// always answers 200 with an [`IpnResponse`].
pub async fn vnpay_ipn<B: PaymentBackend>(
    api: web::Data<PaymentFlowApi<B>>,
    query: web::Query<GatewayParams>,
) -> HttpResponse {
    trace!("💻️ Received IPN for {:?}", query.get("vnp_TxnRef"));
    let response = match api.apply_callback(query.into_inner(), CallbackSource::Ipn).await {
        Ok(result) => result.ipn_response(),
        Err(e) => {
            error!("💻️ Could not process IPN. {e}");
            IpnResponse::unknown_error()
        },
    };
    HttpResponse::Ok().json(response)
}

route!(payments_for_order => Get "/payments/order/{order_id}" impl PaymentBackend);
pub async fn payments_for_order<B: PaymentBackend>(
    api: web::Data<PaymentFlowApi<B>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    trace!("💻️ Received request for payments of order #{order_id}");
    let payments = api.payments_for_order(order_id).await?;
    Ok(HttpResponse::Ok().json(payments))
}

//----------------------------------------------   Vouchers  ----------------------------------------------------
route!(available_vouchers => Get "/vouchers/available" impl OrderManagement);
pub async fn available_vouchers<B: OrderManagement>(
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received request for available vouchers");
    let vouchers = api.available_vouchers().await?;
    Ok(HttpResponse::Ok().json(vouchers))
}

//----------------------------------------------   Push tokens  ----------------------------------------------------
route!(register_push_token => Put "/users/{id}/push-token" impl PushTokenStore, PushTransport);
pub async fn register_push_token<S: PushTokenStore, T: PushTransport>(
    notifier: web::Data<PushNotifier<S, T>>,
    path: web::Path<i64>,
    body: web::Json<PushTokenParams>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    trace!("💻️ Received push token for user #{user_id}");
    notifier.register_token(user_id, body.into_inner().token).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Push token saved")))
}

route!(remove_push_token => Delete "/users/{id}/push-token" impl PushTokenStore, PushTransport);
pub async fn remove_push_token<S: PushTokenStore, T: PushTransport>(
    notifier: web::Data<PushNotifier<S, T>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    trace!("💻️ Received request to remove the push token of user #{user_id}");
    notifier.remove_token(user_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Push token removed")))
}
