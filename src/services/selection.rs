use crate::models::{Seat, SeatStatus};

/// Локальный выбор мест на странице сеанса. Создаётся вместе со страницей
/// и живёт ровно столько же; до нажатия "продолжить" backend не вызывается.
#[derive(Debug, Clone, Default)]
pub struct SeatSelection {
    seats: Vec<Seat>,
    selected: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Selected,
    Deselected,
    /// Место занято или не существует
    Rejected,
}

impl SeatSelection {
    pub fn new(seats: Vec<Seat>) -> Self {
        Self {
            seats,
            selected: Vec::new(),
        }
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn seat(&self, seat_id: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.id == seat_id)
    }

    pub fn toggle(&mut self, seat_id: &str) -> Toggle {
        if let Some(pos) = self.selected.iter().position(|id| id == seat_id) {
            self.selected.remove(pos);
            return Toggle::Deselected;
        }
        match self.seat(seat_id) {
            Some(seat) if seat.is_available() => {
                self.selected.push(seat_id.to_string());
                Toggle::Selected
            }
            _ => Toggle::Rejected,
        }
    }

    pub fn is_selected(&self, seat_id: &str) -> bool {
        self.selected.iter().any(|id| id == seat_id)
    }

    /// Выбранные id в порядке выбора.
    pub fn selected_ids(&self) -> &[String] {
        &self.selected
    }

    pub fn selected_seats(&self) -> Vec<&Seat> {
        self.selected.iter().filter_map(|id| self.seat(id)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Помечает места занятыми и убирает их из выбора.
    pub fn mark_unavailable(&mut self, seat_ids: &[String]) {
        for seat in self.seats.iter_mut().filter(|s| seat_ids.contains(&s.id)) {
            seat.status = SeatStatus::Holding;
        }
        self.selected.retain(|id| !seat_ids.contains(id));
    }

    /// Обновляет карту мест и выбрасывает из выбора то, что стало недоступно.
    /// Возвращает выброшенные id.
    pub fn replace_seat_map(&mut self, seats: Vec<Seat>) -> Vec<String> {
        self.seats = seats;
        let (keep, dropped): (Vec<String>, Vec<String>) = std::mem::take(&mut self.selected)
            .into_iter()
            .partition(|id| self.seats.iter().any(|s| &s.id == id && s.is_available()));
        self.selected = keep;
        dropped
    }
}
