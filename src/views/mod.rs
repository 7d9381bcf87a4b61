//! Текстовые представления для CLI. Сюда попадают только готовые
//! данные и локализованные сообщения, не сырые ошибки.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::models::{Booking, Cinema, Movie, Seat, SeatType};
use crate::services::catalog::{BookingPage, MovieDetail};
use crate::services::order::OrderSummary;
use crate::services::payment::ConfirmationView;
use crate::services::selection::SeatSelection;

/// 180000 -> "180.000 ₫"
pub fn format_vnd(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{grouped} ₫")
}

pub fn movie_list(movies: &[Movie]) -> String {
    if movies.is_empty() {
        return "Hiện chưa có phim nào.\n".to_string();
    }
    let mut out = String::new();
    for movie in movies {
        let _ = write!(out, "{:<26} {}", movie.id, movie.display_title());
        if movie.duration > 0 {
            let _ = write!(out, " ({} phút)", movie.duration);
        }
        if let Some(age) = &movie.age_rating {
            let _ = write!(out, " [{age}]");
        }
        if !movie.genres.is_empty() {
            let _ = write!(out, " - {}", movie.genres.join(", "));
        }
        out.push('\n');
    }
    out
}

pub fn movie_detail(detail: &MovieDetail, date: NaiveDate, dates: &[NaiveDate]) -> String {
    let movie = &detail.movie;
    let mut out = String::new();
    let _ = writeln!(out, "{}", movie.display_title());
    if let Some(director) = &movie.director {
        let _ = writeln!(out, "Đạo diễn: {director}");
    }
    if !movie.cast.is_empty() {
        let _ = writeln!(out, "Diễn viên: {}", movie.cast.join(", "));
    }
    if let Some(description) = &movie.description {
        let _ = writeln!(out, "\n{description}");
    }

    let strip: Vec<String> = dates
        .iter()
        .map(|d| {
            let label = d.format("%d/%m").to_string();
            if *d == date {
                format!("[{label}]")
            } else {
                label
            }
        })
        .collect();
    let _ = writeln!(out, "\nLịch chiếu: {}", strip.join("  "));

    let schedule = detail.schedule(date);
    if schedule.is_empty() {
        let _ = writeln!(out, "Không có suất chiếu trong ngày này.");
    }
    for theater in schedule {
        let _ = writeln!(out, "\n{}", theater.cinema_name);
        if !theater.address.is_empty() {
            let _ = writeln!(out, "  {}", theater.address);
        }
        for showtime in &theater.showtimes {
            let _ = writeln!(
                out,
                "  {}  {}  {}",
                showtime.start_time(),
                format_vnd(showtime.price),
                showtime.id
            );
        }
    }
    out
}

pub fn theater_list(cinemas: &[Cinema]) -> String {
    if cinemas.is_empty() {
        return "Không tìm thấy rạp nào.\n".to_string();
    }
    let mut out = String::new();
    for cinema in cinemas {
        let _ = write!(out, "{:<26} {}", cinema.id, cinema.name);
        if let Some(distance) = cinema.distance {
            let _ = write!(out, " ({distance:.1} km)");
        }
        out.push('\n');
        if !cinema.address.is_empty() {
            let _ = writeln!(out, "{:<26} {}", "", cinema.address);
        }
    }
    out
}

pub fn booking_header(page: &BookingPage) -> String {
    let mut out = format!(
        "{} | {} | {} {}",
        page.movie.display_title(),
        page.cinema.name,
        page.showtime.date().format("%d/%m/%Y"),
        page.showtime.start_time()
    );
    if let Some(room) = &page.room {
        let _ = write!(out, " | {} ({})", room.name, room.room_type);
    }
    out.push('\n');
    out
}

fn seat_marker(seat: &Seat, selected: bool) -> char {
    if selected {
        '■'
    } else if !seat.is_available() {
        'x'
    } else {
        match seat.seat_type {
            SeatType::Vip => 'V',
            SeatType::Couple => 'C',
            _ => '·',
        }
    }
}

/// Сетка мест: ряды по алфавиту, места по номеру.
pub fn seat_map(selection: &SeatSelection) -> String {
    let mut rows: BTreeMap<&str, Vec<&Seat>> = BTreeMap::new();
    for seat in selection.seats() {
        rows.entry(seat.row.as_str()).or_default().push(seat);
    }

    let mut out = String::from("            MÀN HÌNH\n");
    for (row, mut seats) in rows {
        seats.sort_by_key(|s| s.number);
        let _ = write!(out, "{row:>2} ");
        for seat in seats {
            let _ = write!(out, " {}{:<2}", seat_marker(seat, selection.is_selected(&seat.id)), seat.number);
        }
        out.push('\n');
    }
    out.push_str("\n· trống  V VIP  C ghế đôi  ■ đang chọn  x đã có người\n");
    out
}

pub fn order_summary(summary: &OrderSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Ghế: {}", summary.seat_ids.join(", "));
    for line in &summary.ticket_lines {
        let _ = writeln!(
            out,
            "  {} x{} @ {} = {}",
            line.ticket_type,
            line.quantity,
            format_vnd(line.price_per_ticket),
            format_vnd(line.line_total())
        );
    }
    for line in &summary.concession_lines {
        let _ = writeln!(
            out,
            "  {} x{} = {}",
            line.concession.name,
            line.quantity,
            format_vnd(line.line_total())
        );
    }
    let _ = writeln!(out, "Tổng cộng: {}", format_vnd(summary.total()));
    out
}

fn booking_lines(out: &mut String, booking: &Booking) {
    let _ = writeln!(out, "Mã đặt vé: {}", booking.confirmation_code);
    if !booking.seats.is_empty() {
        let _ = writeln!(out, "Ghế: {}", booking.seats.join(", "));
    }
    let _ = writeln!(out, "Tổng tiền: {}", format_vnd(booking.total_price));
}

pub fn confirmation(view: &ConfirmationView) -> String {
    let mut out = String::new();
    match view {
        ConfirmationView::Success { booking } => {
            let _ = writeln!(out, "✓ Thanh toán thành công!");
            booking_lines(&mut out, booking);
        }
        ConfirmationView::Failure { message, booking, .. } => {
            let _ = writeln!(out, "✗ {message}");
            if let Some(booking) = booking {
                booking_lines(&mut out, booking);
            }
        }
    }
    out
}

pub fn error_line(message: &str) -> String {
    format!("✗ {message}")
}
