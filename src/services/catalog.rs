//! Страницы для чтения: афиша, карточка фильма, кинотеатры, страница сеанса.
//!
//! Независимые запросы идут параллельно через `tokio::try_join!`.

use chrono::{Duration, NaiveDate};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::geo::haversine_km;
use crate::models::{Cinema, Concession, GeoPoint, Movie, Room, Seat, Showtime};
use crate::services::api_client::{CinemaApiClient, MovieQuery, ShowtimeQuery};

/// Сколько дней показывает полоса дат на карточке фильма.
pub const DATE_STRIP_DAYS: usize = 4;

pub async fn home(api: &CinemaApiClient, status: Option<&str>) -> Result<Vec<Movie>, ApiError> {
    let query = MovieQuery {
        status: status.map(str::to_string),
        ..Default::default()
    };
    api.list_movies(&query).await
}

#[derive(Debug, Clone)]
pub struct MovieDetail {
    pub movie: Movie,
    pub showtimes: Vec<Showtime>,
    pub cinemas: Vec<Cinema>,
}

impl MovieDetail {
    pub fn schedule(&self, date: NaiveDate) -> Vec<TheaterSchedule> {
        group_showtimes_by_theater(&self.showtimes, &self.cinemas, date)
    }
}

pub async fn movie_detail(api: &CinemaApiClient, movie_id: &str) -> Result<MovieDetail, ApiError> {
    let showtime_query = ShowtimeQuery {
        movie_id: Some(movie_id.to_string()),
        ..Default::default()
    };
    let (movie, showtimes, cinemas) = tokio::try_join!(
        api.get_movie(movie_id),
        api.list_showtimes(&showtime_query),
        api.list_cinemas(None),
    )?;
    Ok(MovieDetail {
        movie,
        showtimes,
        cinemas,
    })
}

/// Сеансы одного кинотеатра на выбранную дату.
#[derive(Debug, Clone, PartialEq)]
pub struct TheaterSchedule {
    pub cinema_id: String,
    pub cinema_name: String,
    pub address: String,
    pub showtimes: Vec<Showtime>,
}

/// Группирует сеансы даты по кинотеатрам; группы по имени, сеансы по времени.
pub fn group_showtimes_by_theater(
    showtimes: &[Showtime],
    cinemas: &[Cinema],
    date: NaiveDate,
) -> Vec<TheaterSchedule> {
    let mut groups: Vec<TheaterSchedule> = Vec::new();
    for showtime in showtimes.iter().filter(|s| s.date() == date) {
        if let Some(group) = groups.iter_mut().find(|g| g.cinema_id == showtime.cinema_id) {
            group.showtimes.push(showtime.clone());
            continue;
        }
        let (name, address) = match cinemas.iter().find(|c| c.id == showtime.cinema_id) {
            Some(c) => (c.name.clone(), c.address.clone()),
            None => {
                debug!("Showtime {} refers to unknown cinema {}", showtime.id, showtime.cinema_id);
                (showtime.cinema_id.clone(), String::new())
            }
        };
        groups.push(TheaterSchedule {
            cinema_id: showtime.cinema_id.clone(),
            cinema_name: name,
            address,
            showtimes: vec![showtime.clone()],
        });
    }

    for group in &mut groups {
        group.showtimes.sort_by_key(|s| s.show_date_time);
    }
    groups.sort_by(|a, b| a.cinema_name.cmp(&b.cinema_name));
    groups
}

pub fn upcoming_dates(today: NaiveDate, days: usize) -> Vec<NaiveDate> {
    (0..days as i64).map(|i| today + Duration::days(i)).collect()
}

/// Считает расстояние от `origin` и сортирует по нему; без координат в конец.
pub fn sort_by_distance(mut cinemas: Vec<Cinema>, origin: GeoPoint) -> Vec<Cinema> {
    for cinema in &mut cinemas {
        if let Some(location) = cinema.location {
            cinema.distance = Some(haversine_km(origin, location));
        }
    }
    cinemas.sort_by(|a, b| match (a.distance, b.distance) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });
    cinemas
}

pub async fn theaters(
    api: &CinemaApiClient,
    city: Option<&str>,
    origin: Option<GeoPoint>,
) -> Result<Vec<Cinema>, ApiError> {
    let cinemas = api.list_cinemas(city).await?;
    Ok(match origin {
        Some(origin) => sort_by_distance(cinemas, origin),
        None => cinemas,
    })
}

pub async fn nearby(api: &CinemaApiClient, origin: GeoPoint, radius_km: f64) -> Result<Vec<Cinema>, ApiError> {
    let cinemas = api.nearby_cinemas(origin, radius_km).await?;
    Ok(within_radius(sort_by_distance(cinemas, origin), radius_km))
}

fn within_radius(cinemas: Vec<Cinema>, radius_km: f64) -> Vec<Cinema> {
    cinemas
        .into_iter()
        .filter(|c| c.distance.map_or(true, |d| d <= radius_km))
        .collect()
}

/// Всё, что нужно странице выбора мест.
#[derive(Debug, Clone)]
pub struct BookingPage {
    pub showtime: Showtime,
    pub movie: Movie,
    pub cinema: Cinema,
    pub room: Option<Room>,
    pub seats: Vec<Seat>,
    pub concessions: Vec<Concession>,
}

impl BookingPage {
    /// Цена билета сеанса; если backend не прислал цену — значение по умолчанию.
    pub fn ticket_price(&self, fallback: i64) -> i64 {
        if self.showtime.price > 0 {
            self.showtime.price
        } else {
            fallback
        }
    }
}

pub async fn booking_page(api: &CinemaApiClient, showtime_id: &str) -> Result<BookingPage, ApiError> {
    let showtime = match api.get_showtime(showtime_id).await {
        Ok(s) => s,
        Err(ApiError::Validation(m)) => {
            return Err(ApiError::NotFound(format!("showtime {showtime_id}: {m}")))
        }
        Err(e) => return Err(e),
    };

    let (movie, cinema, seats, concessions) = tokio::try_join!(
        api.get_movie(&showtime.movie_id),
        api.get_cinema(&showtime.cinema_id),
        api.get_seats(&showtime.id),
        api.list_concessions(Some(&showtime.cinema_id)),
    )?;

    let room = match showtime.room_id.as_deref() {
        None => None,
        Some(room_id) => match cinema.room(room_id) {
            Some(room) => Some(room.clone()),
            None => match api.get_room(room_id).await {
                Ok(room) => Some(room),
                Err(e) => {
                    warn!("Room {} for showtime {} unavailable: {}", room_id, showtime.id, e);
                    None
                }
            },
        },
    };

    Ok(BookingPage {
        showtime,
        movie,
        cinema,
        room,
        seats,
        concessions,
    })
}
