//! Reservations on books currently lent to someone else
//!
//! The portal keeps one waiting queue per title and mails the address given
//! when reserving once the book frees up. Every operation here needs an
//! authenticated session.
use crate::book::{Book, BookStatus, Reservation};
use crate::detail::fetch_book_page;
use crate::errors::MlolError;
use crate::extraction::{parse_queue_position, parse_reservations, parse_reserve_outcome};
use crate::networking::{
    CANCEL_RESERVATION_ENDPOINT, Fetch, PRE_RESERVE_ENDPOINT, PageRequest, QUEUE_POSITION_ENDPOINT,
    RESERVE_ENDPOINT, RESOURCES_ENDPOINT,
};
use log::{debug, error, info, warn};

/// Where the portal lands after a successful cancellation
const CANCELLED_MARKER: &str = "msg=970";
/// Where it lands when it refused to cancel
const CANCEL_REFUSED_MARKER: &str = "msg=960";
const ACCOUNT: &str = "account";

/// How a reservation request ended, when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved,
    /// The account already held a reservation for the book
    AlreadyReserved,
}

fn failed(target: &str, reason: impl Into<String>) -> MlolError {
    MlolError::Reservation {
        target: target.to_string(),
        reason: reason.into(),
    }
}

fn require_authentication<F: Fetch + ?Sized>(fetcher: &F, target: &str) -> Result<(), MlolError> {
    if fetcher.is_authenticated() {
        Ok(())
    } else {
        Err(failed(
            target,
            "an authenticated session is required to manage reservations",
        ))
    }
}

/// Reservations on the account page, without queue positions
fn list_reservations<F: Fetch + ?Sized>(fetcher: &F) -> Result<Vec<Reservation>, MlolError> {
    require_authentication(fetcher, ACCOUNT)?;
    let fetched = fetcher
        .fetch(&PageRequest::new(RESOURCES_ENDPOINT))
        .map_err(|e| e.into_reservation(ACCOUNT))?;
    if !fetched.is_success() {
        return Err(failed(
            ACCOUNT,
            format!("HTTP {} from {}", fetched.status, fetched.url),
        ));
    }
    parse_reservations(&fetched.text()).map_err(|e| e.into_reservation(ACCOUNT))
}

/// The account's reservations, each with its place in the queue
///
/// One extra request per reservation is made for the queue position.
pub fn reservations<F: Fetch + ?Sized>(fetcher: &F) -> Result<Vec<Reservation>, MlolError> {
    let mut reservations = list_reservations(fetcher)?;
    for reservation in &mut reservations {
        reservation.queue_position =
            queue_position(fetcher, &reservation.id).map_err(|e| e.into_reservation(ACCOUNT))?;
    }
    debug!("Account holds {} reservations", reservations.len());
    Ok(reservations)
}

/// Position of reservation `reservation_id` in its queue, when the portal tells
pub fn queue_position<F: Fetch + ?Sized>(
    fetcher: &F,
    reservation_id: &str,
) -> Result<Option<u32>, MlolError> {
    let fetched = fetcher.fetch(&PageRequest::new(QUEUE_POSITION_ENDPOINT).query("id", reservation_id))?;
    let position = if fetched.is_success() {
        parse_queue_position(&fetched.text())?
    } else {
        None
    };
    if position.is_none() {
        warn!("Failed to get queue position for reservation #{reservation_id}");
    }
    Ok(position)
}

/// Reserve book `id`, to be notified at `email` once it is free
///
/// Only books currently taken can be reserved; an available book should be
/// downloaded instead.
pub fn reserve_by_id<F: Fetch + ?Sized>(
    fetcher: &F,
    id: &str,
    email: &str,
) -> Result<ReserveOutcome, MlolError> {
    let target = format!("book {id}");
    require_authentication(fetcher, &target)?;
    let email = email.trim();
    if email.is_empty() {
        return Err(failed(&target, "an email address is required"));
    }

    let status = fetch_book_page(fetcher, id)
        .map_err(|e| e.into_reservation(&target))?
        .details
        .status;
    match status {
        Some(BookStatus::Taken) => {}
        Some(BookStatus::Reserved) => {
            info!("Book {id} is already reserved by this account");
            return Ok(ReserveOutcome::AlreadyReserved);
        }
        Some(BookStatus::Available) => {
            return Err(failed(&target, "the book is available, borrow it instead"));
        }
        Some(status) => {
            return Err(failed(
                &target,
                format!("only taken books can be reserved (status: {status})"),
            ));
        }
        None => return Err(failed(&target, "the lending status of the book is unknown")),
    }

    // the portal expects the address unencoded
    let request = PageRequest::new(format!("{RESERVE_ENDPOINT}?id={id}&email={email}"))
        .header(
            "Referer",
            format!("{}{PRE_RESERVE_ENDPOINT}?id={id}", fetcher.base_url()),
        )
        .header("Accept", "text/html, */*; q=0.01");
    let fetched = fetcher
        .fetch(&request)
        .map_err(|e| e.into_reservation(&target))?;
    if !fetched.is_success() {
        return Err(failed(
            &target,
            format!("HTTP {} from {}", fetched.status, fetched.url),
        ));
    }

    let Some(message) = parse_reserve_outcome(&fetched.text()).map_err(|e| e.into_reservation(&target))?
    else {
        error!("Failed to reserve book {id} (unknown outcome)");
        return Err(failed(&target, "the portal did not report an outcome"));
    };

    let lowered = message.to_lowercase();
    if lowered.contains("con successo") {
        info!("Book {id} reserved, notifications go to {email}");
        Ok(ReserveOutcome::Reserved)
    } else if lowered.contains("prenotazione attiva") {
        warn!("You already have an active reservation for book {id}");
        Ok(ReserveOutcome::AlreadyReserved)
    } else {
        error!("Failed to reserve book {id}: {message}");
        Err(failed(&target, format!("the portal refused: {message}")))
    }
}

pub fn reserve_book<F: Fetch + ?Sized>(
    fetcher: &F,
    book: &Book,
    email: &str,
) -> Result<ReserveOutcome, MlolError> {
    reserve_by_id(fetcher, &book.id, email)
}

/// Cancel reservation `reservation_id`
///
/// The portal answers with a redirect to a message page whose code tells
/// success from refusal.
pub fn cancel_by_id<F: Fetch + ?Sized>(fetcher: &F, reservation_id: &str) -> Result<(), MlolError> {
    let target = format!("reservation {reservation_id}");
    require_authentication(fetcher, &target)?;

    let request = PageRequest::new(CANCEL_RESERVATION_ENDPOINT)
        .query("id", reservation_id)
        .header("Referer", format!("{}{RESOURCES_ENDPOINT}", fetcher.base_url()));
    let fetched = fetcher
        .fetch(&request)
        .map_err(|e| e.into_reservation(&target))?;
    debug!("Cancellation of {reservation_id} landed on {}", fetched.url);

    if fetched.url.ends_with(CANCELLED_MARKER) {
        info!("Reservation {reservation_id} cancelled");
        Ok(())
    } else if fetched.url.ends_with(CANCEL_REFUSED_MARKER) {
        error!("Failed to cancel reservation {reservation_id}");
        Err(failed(&target, "the portal refused to cancel it"))
    } else {
        error!("Failed to cancel reservation {reservation_id} (unknown outcome)");
        Err(failed(
            &target,
            format!("unknown outcome, landed on {}", fetched.url),
        ))
    }
}

/// Cancel this account's reservation of `book`
///
/// The record's own status is trusted when it has one; a shallow record is
/// looked up first.
pub fn cancel_book_reservation<F: Fetch + ?Sized>(fetcher: &F, book: &Book) -> Result<(), MlolError> {
    let target = format!("book {}", book.id);
    require_authentication(fetcher, &target)?;

    let status = match book.status() {
        Some(status) => Some(status),
        None => {
            fetch_book_page(fetcher, &book.id)
                .map_err(|e| e.into_reservation(&target))?
                .details
                .status
        }
    };
    if status != Some(BookStatus::Reserved) {
        let shown = status.map_or_else(|| "unknown".to_string(), |s| s.to_string());
        return Err(failed(
            &target,
            format!("the book is not reserved by this account (status: {shown})"),
        ));
    }

    let reservation = list_reservations(fetcher)?
        .into_iter()
        .find(|reservation| reservation.book.id == book.id)
        .ok_or_else(|| failed(&target, "no reservation for it on the account page"))?;
    cancel_by_id(fetcher, &reservation.id)
}
