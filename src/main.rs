use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cinema_booking::{
    config::Config,
    controllers,
    error::ApiError,
    models::{CustomerInfo, GeoPoint, ReleaseSeatsRequest},
    services::{
        catalog,
        checkout::{CheckoutError, CheckoutFlow},
        hold_timer::{format_remaining, HoldTimer},
        order::ConcessionCart,
        payment::{resolve_return, GatewayReturn},
    },
    views, AppState,
};

#[derive(Parser)]
#[command(name = "cinema", version, about = "Đặt vé xem phim")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Danh sách phim
    Movies {
        /// now-showing | coming-soon
        #[arg(long)]
        status: Option<String>,
    },
    /// Thông tin phim và lịch chiếu
    Movie {
        id: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Danh sách rạp, có thể sắp xếp theo khoảng cách
    Theaters(TheaterArgs),
    /// Sơ đồ ghế của suất chiếu
    Seats { showtime: String },
    /// Giữ ghế, tạo đơn và chuyển sang thanh toán
    Book(BookArgs),
    /// Kiểm tra kết quả thanh toán từ URL trả về
    Confirm {
        /// URL hoặc query string mà cổng thanh toán trả về
        #[arg(long)]
        query: String,
    },
    /// Trả lại ghế đang giữ
    Release {
        #[arg(long)]
        showtime: String,
        #[arg(long, value_delimiter = ',', required = true)]
        seats: Vec<String>,
    },
}

#[derive(Args)]
struct TheaterArgs {
    #[arg(long)]
    city: Option<String>,
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    lat: Option<f64>,
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lng: Option<f64>,
    /// Bán kính tìm kiếm, km
    #[arg(long, requires = "lat")]
    radius: Option<f64>,
}

#[derive(Args)]
struct BookArgs {
    #[arg(long)]
    showtime: String,
    #[arg(long, value_delimiter = ',', required = true)]
    seats: Vec<String>,
    #[arg(long)]
    name: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    email: Option<String>,
    /// id=số lượng, có thể lặp lại
    #[arg(long = "concession", value_parser = parse_concession)]
    concessions: Vec<(String, u32)>,
}

fn parse_concession(raw: &str) -> Result<(String, u32), String> {
    let (id, qty) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected id=quantity, got '{raw}'"))?;
    let qty = qty
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid quantity in '{raw}': {e}"))?;
    Ok((id.trim().to_string(), qty))
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.app.rust_log).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    // stdout остаётся для представлений, логи идут в stderr
    if config.app.log_format == "json" {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn user_facing(e: ApiError) -> anyhow::Error {
    anyhow::anyhow!(views::error_line(&e.user_message()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;
    init_tracing(&config);

    let cli = Cli::parse();
    info!("cinema client starting ({})", config.app.environment);
    let state = AppState::new(config).map_err(user_facing)?;

    match cli.command {
        Command::Movies { status } => {
            let movies = catalog::home(&state.api, status.as_deref()).await.map_err(user_facing)?;
            print!("{}", views::movie_list(&movies));
        }
        Command::Movie { id, date } => {
            let detail = catalog::movie_detail(&state.api, &id).await.map_err(user_facing)?;
            let today = chrono::Local::now().date_naive();
            let dates = catalog::upcoming_dates(today, catalog::DATE_STRIP_DAYS);
            print!("{}", views::movie_detail(&detail, date.unwrap_or(today), &dates));
        }
        Command::Theaters(args) => theaters(&state, args).await?,
        Command::Seats { showtime } => {
            let page = catalog::booking_page(&state.api, &showtime).await.map_err(user_facing)?;
            let flow = CheckoutFlow::from_page(state.api.clone(), &page, &state.config.booking);
            print!("{}", views::booking_header(&page));
            print!("{}", views::seat_map(flow.selection()));
        }
        Command::Book(args) => book(&state, args).await?,
        Command::Confirm { query } => {
            let ret = GatewayReturn::parse(&query).map_err(user_facing)?;
            let view = resolve_return(&state.api, &ret, &state.config.payment.success_code).await;
            print!("{}", views::confirmation(&view));
            if !view.is_success() {
                std::process::exit(1);
            }
        }
        Command::Release { showtime, seats } => {
            let request = ReleaseSeatsRequest {
                showtime_id: showtime,
                seat_ids: seats,
            };
            state.api.release_seats(&request).await.map_err(user_facing)?;
            println!("Đã trả ghế {}", request.seat_ids.join(", "));
        }
    }
    Ok(())
}

async fn theaters(state: &AppState, args: TheaterArgs) -> anyhow::Result<()> {
    let origin = match (args.lat, args.lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
        _ => None,
    };
    let cinemas = match (origin, args.radius) {
        (Some(origin), Some(radius)) => catalog::nearby(&state.api, origin, radius).await,
        _ => catalog::theaters(&state.api, args.city.as_deref(), origin).await,
    }
    .map_err(user_facing)?;
    print!("{}", views::theater_list(&cinemas));
    Ok(())
}

enum Outcome {
    Returned(GatewayReturn),
    Expired,
    Interrupted,
    ListenerClosed,
}

async fn book(state: &Arc<AppState>, args: BookArgs) -> anyhow::Result<()> {
    let config = &state.config;
    let page = match catalog::booking_page(&state.api, &args.showtime).await {
        Ok(page) => page,
        Err(ApiError::NotFound(_)) => {
            bail!(views::error_line("Không tìm thấy suất chiếu. Xem danh sách phim: cinema movies"))
        }
        Err(e) => return Err(user_facing(e)),
    };

    let mut flow = CheckoutFlow::from_page(state.api.clone(), &page, &config.booking);
    for seat_id in &args.seats {
        flow.toggle_seat(seat_id)
            .map_err(|e| anyhow::anyhow!(views::error_line(&e.user_message())))?;
    }
    flow.proceed_to_info()
        .map_err(|e| anyhow::anyhow!(views::error_line(&e.user_message())))?;

    let mut cart = ConcessionCart::default();
    for (item_id, quantity) in &args.concessions {
        cart.set(item_id, *quantity);
    }

    print!("{}", views::booking_header(&page));
    print!("{}", views::order_summary(&flow.summary(&page.concessions, &cart)));

    // приёмник должен слушать до того, как браузер уйдёт на шлюз
    let mut server = controllers::serve_callback(config.payment.callback_addr, &config.return_path())
        .await
        .context("cannot start payment return listener")?;

    let customer = CustomerInfo {
        full_name: args.name,
        phone: args.phone,
        email: args.email,
    };
    let redirect = match flow
        .submit(customer, &page.concessions, &cart, &config.payment.return_url)
        .await
    {
        Ok(redirect) => redirect,
        Err(e) => {
            if let CheckoutError::SeatsTaken { .. } = e {
                print!("{}", views::seat_map(flow.selection()));
            }
            server.shutdown().await;
            bail!(views::error_line(&e.user_message()));
        }
    };

    println!("Mã đặt vé: {}", redirect.confirmation_code);
    println!("Mở liên kết sau để thanh toán:\n{}", redirect.payment_url);

    let (expired_tx, mut expired_rx) = oneshot::channel::<()>();
    let timer = HoldTimer::start(Duration::from_secs(config.hold.seconds), move || {
        let _ = expired_tx.send(());
    });
    let mut ticker = tokio::time::interval(Duration::from_secs(30));
    ticker.tick().await;

    let outcome = loop {
        tokio::select! {
            ret = server.returns.recv() => match ret {
                Some(ret) => break Outcome::Returned(ret),
                None => break Outcome::ListenerClosed,
            },
            _ = &mut expired_rx => break Outcome::Expired,
            _ = tokio::signal::ctrl_c() => break Outcome::Interrupted,
            _ = ticker.tick() => {
                println!("Thời gian giữ ghế còn lại: {}", format_remaining(timer.remaining()));
            }
        }
    };

    let result = match outcome {
        Outcome::Returned(ret) => {
            timer.cancel().await;
            let view = flow.confirm(&ret, &config.payment.success_code).await;
            print!("{}", views::confirmation(&view));
            if view.is_success() {
                Ok(())
            } else {
                Err(anyhow::anyhow!("payment not confirmed"))
            }
        }
        Outcome::Expired => {
            flow.expire_hold().await;
            println!("{}", views::error_line(&CheckoutError::HoldExpired.user_message()));
            match flow.back_to_seat_selection().await {
                Ok(_) => print!("{}", views::seat_map(flow.selection())),
                Err(e) => warn!("Could not refresh seat map after expiry: {}", e),
            }
            Err(anyhow::anyhow!("seat hold expired"))
        }
        Outcome::Interrupted => {
            timer.cancel().await;
            match flow.cancel().await {
                Ok(true) => println!("Đã hủy và trả lại ghế."),
                Ok(false) => warn!("Cancelled, but seats were not confirmed released"),
                Err(e) => warn!("Cancel failed: {}", e),
            }
            Err(anyhow::anyhow!("cancelled"))
        }
        Outcome::ListenerClosed => {
            timer.cancel().await;
            flow.cancel().await.ok();
            Err(anyhow::anyhow!("payment return listener stopped"))
        }
    };

    server.shutdown().await;
    result
}
