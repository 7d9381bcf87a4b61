use std::collections::BTreeMap;
use tracing::warn;

use crate::models::{Concession, ConcessionSelection, Seat, SeatType, TicketTypeLine};

/// Корзина бара: id товара -> количество.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConcessionCart {
    items: BTreeMap<String, u32>,
}

impl ConcessionCart {
    /// +1 / -1 у кнопок. Количество не уходит ниже нуля, нулевые позиции удаляются.
    pub fn change(&mut self, item_id: &str, delta: i32) {
        let current = self.items.get(item_id).copied().unwrap_or(0);
        let next = i64::from(current) + i64::from(delta);
        if next <= 0 {
            self.items.remove(item_id);
        } else {
            self.items
                .insert(item_id.to_string(), u32::try_from(next).unwrap_or(u32::MAX));
        }
    }

    pub fn set(&mut self, item_id: &str, quantity: u32) {
        if quantity == 0 {
            self.items.remove(item_id);
        } else {
            self.items.insert(item_id.to_string(), quantity);
        }
    }

    pub fn quantity(&self, item_id: &str) -> u32 {
        self.items.get(item_id).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.items.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcessionLine {
    pub concession: Concession,
    pub quantity: u32,
}

impl ConcessionLine {
    pub fn line_total(&self) -> i64 {
        self.concession.price * i64::from(self.quantity)
    }
}

/// Сводка заказа перед оплатой.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub seat_ids: Vec<String>,
    pub ticket_lines: Vec<TicketTypeLine>,
    pub concession_lines: Vec<ConcessionLine>,
}

fn ticket_label(base: &str, seat_type: SeatType) -> String {
    match seat_type {
        SeatType::Vip => format!("{base} - VIP"),
        SeatType::Couple => format!("{base} - Ghế đôi"),
        _ => base.to_string(),
    }
}

impl OrderSummary {
    /// Билеты группируются по (тип, цена); цена места, если её нет — цена сеанса.
    pub fn build(
        seats: &[&Seat],
        showtime_price: i64,
        ticket_type: &str,
        catalog: &[Concession],
        cart: &ConcessionCart,
    ) -> Self {
        let mut ticket_lines: Vec<TicketTypeLine> = Vec::new();
        for seat in seats {
            let label = ticket_label(ticket_type, seat.seat_type);
            let price = seat.price.unwrap_or(showtime_price);
            match ticket_lines
                .iter_mut()
                .find(|l| l.ticket_type == label && l.price_per_ticket == price)
            {
                Some(line) => line.quantity += 1,
                None => ticket_lines.push(TicketTypeLine {
                    ticket_type: label,
                    quantity: 1,
                    price_per_ticket: price,
                }),
            }
        }

        let concession_lines = cart
            .iter()
            .filter_map(|(item_id, quantity)| {
                match catalog.iter().find(|c| c.id == item_id) {
                    Some(c) => Some(ConcessionLine {
                        concession: c.clone(),
                        quantity,
                    }),
                    None => {
                        warn!("Concession {} is not sold at this cinema, skipping", item_id);
                        None
                    }
                }
            })
            .collect();

        Self {
            seat_ids: seats.iter().map(|s| s.id.clone()).collect(),
            ticket_lines,
            concession_lines,
        }
    }

    pub fn tickets_total(&self) -> i64 {
        self.ticket_lines.iter().map(TicketTypeLine::line_total).sum()
    }

    pub fn concessions_total(&self) -> i64 {
        self.concession_lines.iter().map(ConcessionLine::line_total).sum()
    }

    pub fn total(&self) -> i64 {
        self.tickets_total() + self.concessions_total()
    }

    pub fn concession_selections(&self) -> Vec<ConcessionSelection> {
        self.concession_lines
            .iter()
            .map(|l| ConcessionSelection {
                item_id: l.concession.id.clone(),
                quantity: l.quantity,
            })
            .collect()
    }
}
