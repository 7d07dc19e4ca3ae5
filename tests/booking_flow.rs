use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Config, NoTls, SimpleQueryMessage, SimpleQueryRow};
use ulid::Ulid;

use vacancy::directory::OpenDirectory;
use vacancy::engine::Engine;
use vacancy::wire;

// ── Test infrastructure ──────────────────────────────────────

async fn start_test_server() -> (SocketAddr, Arc<Engine>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let dir = std::env::temp_dir().join(format!("vacancy_e2e_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let engine = Arc::new(Engine::new(dir.join("vacancy.wal"), Arc::new(OpenDirectory)).unwrap());

    let eng = engine.clone();
    tokio::spawn(async move {
        loop {
            let (socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let eng = eng.clone();
            tokio::spawn(async move {
                let _ = wire::process_connection(socket, eng, "vacancy".to_string(), None).await;
            });
        }
    });

    (addr, engine)
}

/// One connection, acting as `user`. Owner and guest roles are nothing but
/// different session users.
async fn connect(addr: SocketAddr, user: &str) -> tokio_postgres::Client {
    let mut config = Config::new();
    config
        .host(addr.ip().to_string())
        .port(addr.port())
        .dbname("vacancy")
        .user(user)
        .password("vacancy");

    let (client, connection) = config.connect(NoTls).await.unwrap();
    tokio::spawn(async move {
        let _ = connection.await;
    });
    client
}

fn data_rows(msgs: Vec<SimpleQueryMessage>) -> Vec<SimpleQueryRow> {
    msgs.into_iter()
        .filter_map(|m| match m {
            SimpleQueryMessage::Row(row) => Some(row),
            _ => None,
        })
        .collect()
}

/// Register a room and return (room_id, owner client).
async fn setup_room(addr: SocketAddr, owner: Ulid) -> (Ulid, tokio_postgres::Client) {
    let client = connect(addr, &owner.to_string()).await;
    let room_id = Ulid::new();
    let hotel_id = Ulid::new();
    client
        .batch_execute(&format!(
            "INSERT INTO rooms (id, hotel_id, name, base_rate, capacity) \
             VALUES ('{room_id}', '{hotel_id}', '101', 100.00, 2)"
        ))
        .await
        .unwrap();
    (room_id, client)
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn book_cancel_rebook_flow() {
    let (addr, _engine) = start_test_server().await;
    let (room_id, owner_client) = setup_room(addr, Ulid::new()).await;

    let guest_a = Ulid::new();
    let guest_b = Ulid::new();
    let client_a = connect(addr, &guest_a.to_string()).await;
    let client_b = connect(addr, &guest_b.to_string()).await;

    // Quote before committing: 4 nights at the base rate
    let quote = data_rows(
        client_a
            .simple_query(&format!(
                "SELECT * FROM quote WHERE room_id = '{room_id}' \
                 AND check_in = '2025-06-10' AND check_out = '2025-06-14'"
            ))
            .await
            .unwrap(),
    );
    assert_eq!(quote.len(), 1);
    assert_eq!(quote[0].get("nights"), Some("4"));
    assert_eq!(quote[0].get("total"), Some("400.00"));

    // Guest A books those dates
    let booking_a = Ulid::new();
    client_a
        .batch_execute(&format!(
            "INSERT INTO bookings (id, room_id, check_in, check_out) \
             VALUES ('{booking_a}', '{room_id}', '2025-06-10', '2025-06-14')"
        ))
        .await
        .unwrap();

    let rows = data_rows(
        client_a
            .simple_query(&format!("SELECT * FROM bookings WHERE id = '{booking_a}'"))
            .await
            .unwrap(),
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("status"), Some("PENDING"));
    assert_eq!(rows[0].get("total"), Some("400.00"));
    assert_eq!(rows[0].get("guest_id"), Some(guest_a.to_string().as_str()));

    // Guest B collides on an overlapping range
    let booking_b = Ulid::new();
    let err = client_b
        .batch_execute(&format!(
            "INSERT INTO bookings (id, room_id, check_in, check_out) \
             VALUES ('{booking_b}', '{room_id}', '2025-06-12', '2025-06-16')"
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::EXCLUSION_VIOLATION));

    // B cannot cancel A's booking
    let err = client_b
        .batch_execute(&format!(
            "UPDATE bookings SET status = 'CANCELLED' WHERE id = '{booking_a}'"
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::INSUFFICIENT_PRIVILEGE));

    // A cancels with a reason; B's retry now succeeds
    client_a
        .batch_execute(&format!(
            "UPDATE bookings SET status = 'CANCELLED', \
             cancellation_reason = 'change of plans' WHERE id = '{booking_a}'"
        ))
        .await
        .unwrap();
    client_b
        .batch_execute(&format!(
            "INSERT INTO bookings (id, room_id, check_in, check_out) \
             VALUES ('{booking_b}', '{room_id}', '2025-06-12', '2025-06-16')"
        ))
        .await
        .unwrap();

    // Owner confirms B
    owner_client
        .batch_execute(&format!(
            "UPDATE bookings SET status = 'CONFIRMED' WHERE id = '{booking_b}'"
        ))
        .await
        .unwrap();

    let rows = data_rows(
        client_b
            .simple_query(&format!("SELECT * FROM bookings WHERE id = '{booking_b}'"))
            .await
            .unwrap(),
    );
    assert_eq!(rows[0].get("status"), Some("CONFIRMED"));

    // A's cancelled booking keeps its audit trail
    let rows = data_rows(
        client_a
            .simple_query(&format!("SELECT * FROM bookings WHERE id = '{booking_a}'"))
            .await
            .unwrap(),
    );
    assert_eq!(rows[0].get("status"), Some("CANCELLED"));
    assert_eq!(rows[0].get("cancellation_reason"), Some("change of plans"));
    assert!(rows[0].get("cancelled_at").is_some());
}

#[tokio::test]
async fn quote_uses_seasonal_rates() {
    let (addr, _engine) = start_test_server().await;
    let (room_id, owner_client) = setup_room(addr, Ulid::new()).await;

    let season_id = Ulid::new();
    owner_client
        .batch_execute(&format!(
            "INSERT INTO seasons (id, room_id, start_date, end_date, rate, label) \
             VALUES ('{season_id}', '{room_id}', '2025-06-03', '2025-06-30', 150.00, 'High season')"
        ))
        .await
        .unwrap();

    // 2 nights at 100.00 + 3 nights at 150.00
    let guest = connect(addr, &Ulid::new().to_string()).await;
    let quote = data_rows(
        guest
            .simple_query(&format!(
                "SELECT * FROM quote WHERE room_id = '{room_id}' \
                 AND check_in = '2025-06-01' AND check_out = '2025-06-06'"
            ))
            .await
            .unwrap(),
    );
    assert_eq!(quote[0].get("total"), Some("650.00"));

    // Removing the season restores the base rate
    owner_client
        .batch_execute(&format!("DELETE FROM seasons WHERE id = '{season_id}'"))
        .await
        .unwrap();
    let quote = data_rows(
        guest
            .simple_query(&format!(
                "SELECT * FROM quote WHERE room_id = '{room_id}' \
                 AND check_in = '2025-06-01' AND check_out = '2025-06-06'"
            ))
            .await
            .unwrap(),
    );
    assert_eq!(quote[0].get("total"), Some("500.00"));
}

#[tokio::test]
async fn calendar_marks_booked_blocked_and_open() {
    let (addr, _engine) = start_test_server().await;
    let (room_id, owner_client) = setup_room(addr, Ulid::new()).await;

    let guest = connect(addr, &Ulid::new().to_string()).await;
    let booking_id = Ulid::new();
    guest
        .batch_execute(&format!(
            "INSERT INTO bookings (id, room_id, check_in, check_out) \
             VALUES ('{booking_id}', '{room_id}', '2025-06-10', '2025-06-14')"
        ))
        .await
        .unwrap();

    let block_id = Ulid::new();
    owner_client
        .batch_execute(&format!(
            "INSERT INTO blocks (id, room_id, start_date, end_date, reason) \
             VALUES ('{block_id}', '{room_id}', '2025-06-20', '2025-06-22', 'MAINTENANCE')"
        ))
        .await
        .unwrap();

    let cal = data_rows(
        guest
            .simple_query(&format!(
                "SELECT * FROM calendar WHERE room_id = '{room_id}' AND month = '2025-06'"
            ))
            .await
            .unwrap(),
    );
    assert_eq!(cal.len(), 30);
    assert_eq!(cal[0].get("date"), Some("2025-06-01"));
    assert_eq!(cal[0].get("status"), Some("OPEN"));
    assert_eq!(cal[0].get("price"), Some("100.00"));
    assert_eq!(cal[0].get("note"), None);

    // Nights of the 10th through the 13th are booked; checkout day is open
    assert_eq!(cal[9].get("status"), Some("BOOKED"));
    assert_eq!(cal[9].get("price"), None);
    assert_eq!(cal[12].get("status"), Some("BOOKED"));
    assert_eq!(cal[13].get("status"), Some("OPEN"));

    // Blocks occupy their end date too
    assert_eq!(cal[19].get("status"), Some("BLOCKED"));
    assert_eq!(cal[19].get("note"), Some("MAINTENANCE"));
    assert_eq!(cal[21].get("status"), Some("BLOCKED"));
    assert_eq!(cal[22].get("status"), Some("OPEN"));
}

#[tokio::test]
async fn availability_probe_reflects_bookings() {
    let (addr, _engine) = start_test_server().await;
    let (room_id, _owner_client) = setup_room(addr, Ulid::new()).await;

    let guest = connect(addr, &Ulid::new().to_string()).await;
    let probe = format!(
        "SELECT * FROM availability WHERE room_id = '{room_id}' \
         AND check_in = '2025-06-10' AND check_out = '2025-06-14'"
    );

    let rows = data_rows(guest.simple_query(&probe).await.unwrap());
    assert_eq!(rows[0].get("available"), Some("t"));

    let booking_id = Ulid::new();
    guest
        .batch_execute(&format!(
            "INSERT INTO bookings (id, room_id, check_in, check_out) \
             VALUES ('{booking_id}', '{room_id}', '2025-06-12', '2025-06-13')"
        ))
        .await
        .unwrap();

    let rows = data_rows(guest.simple_query(&probe).await.unwrap());
    assert_eq!(rows[0].get("available"), Some("f"));

    // Back-to-back with the existing stay is still fine
    let rows = data_rows(
        guest
            .simple_query(&format!(
                "SELECT * FROM availability WHERE room_id = '{room_id}' \
                 AND check_in = '2025-06-13' AND check_out = '2025-06-15'"
            ))
            .await
            .unwrap(),
    );
    assert_eq!(rows[0].get("available"), Some("t"));
}

#[tokio::test]
async fn blocks_are_owner_only_and_close_dates() {
    let (addr, _engine) = start_test_server().await;
    let (room_id, owner_client) = setup_room(addr, Ulid::new()).await;

    // A guest cannot block the room
    let guest = connect(addr, &Ulid::new().to_string()).await;
    let err = guest
        .batch_execute(&format!(
            "INSERT INTO blocks (id, room_id, start_date, end_date, reason) \
             VALUES ('{}', '{room_id}', '2025-06-20', '2025-06-22', 'PERSONAL_USE')",
            Ulid::new()
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::INSUFFICIENT_PRIVILEGE));

    let block_id = Ulid::new();
    owner_client
        .batch_execute(&format!(
            "INSERT INTO blocks (id, room_id, start_date, end_date, reason, note) \
             VALUES ('{block_id}', '{room_id}', '2025-06-20', '2025-06-22', 'RENOVATION', 'new floors')"
        ))
        .await
        .unwrap();

    // Booking into the blocked range fails; checking in on the block's end
    // date fails too, since blocks occupy their end date
    let err = guest
        .batch_execute(&format!(
            "INSERT INTO bookings (id, room_id, check_in, check_out) \
             VALUES ('{}', '{room_id}', '2025-06-22', '2025-06-24')",
            Ulid::new()
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::EXCLUSION_VIOLATION));

    // Removing the block reopens the dates
    owner_client
        .batch_execute(&format!("DELETE FROM blocks WHERE id = '{block_id}'"))
        .await
        .unwrap();
    guest
        .batch_execute(&format!(
            "INSERT INTO bookings (id, room_id, check_in, check_out) \
             VALUES ('{}', '{room_id}', '2025-06-22', '2025-06-24')",
            Ulid::new()
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn bookings_cannot_be_hard_deleted() {
    let (addr, _engine) = start_test_server().await;
    let (room_id, _owner_client) = setup_room(addr, Ulid::new()).await;

    let guest = connect(addr, &Ulid::new().to_string()).await;
    let booking_id = Ulid::new();
    guest
        .batch_execute(&format!(
            "INSERT INTO bookings (id, room_id, check_in, check_out) \
             VALUES ('{booking_id}', '{room_id}', '2025-06-10', '2025-06-12')"
        ))
        .await
        .unwrap();

    let err = guest
        .batch_execute(&format!("DELETE FROM bookings WHERE id = '{booking_id}'"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::SYNTAX_ERROR));

    // The soft path still works and the row stays queryable
    guest
        .batch_execute(&format!(
            "UPDATE bookings SET status = 'CANCELLED' WHERE id = '{booking_id}'"
        ))
        .await
        .unwrap();
    let rows = data_rows(
        guest
            .simple_query(&format!("SELECT * FROM bookings WHERE id = '{booking_id}'"))
            .await
            .unwrap(),
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("status"), Some("CANCELLED"));
}

#[tokio::test]
async fn reschedule_reprices_and_keeps_original_stay() {
    let (addr, _engine) = start_test_server().await;
    let (room_id, _owner_client) = setup_room(addr, Ulid::new()).await;

    let guest = connect(addr, &Ulid::new().to_string()).await;
    let booking_id = Ulid::new();
    guest
        .batch_execute(&format!(
            "INSERT INTO bookings (id, room_id, check_in, check_out) \
             VALUES ('{booking_id}', '{room_id}', '2025-06-10', '2025-06-14')"
        ))
        .await
        .unwrap();

    guest
        .batch_execute(&format!(
            "UPDATE bookings SET check_in = '2025-06-20', check_out = '2025-06-23' \
             WHERE id = '{booking_id}'"
        ))
        .await
        .unwrap();

    let rows = data_rows(
        guest
            .simple_query(&format!("SELECT * FROM bookings WHERE id = '{booking_id}'"))
            .await
            .unwrap(),
    );
    assert_eq!(rows[0].get("check_in"), Some("2025-06-20"));
    assert_eq!(rows[0].get("check_out"), Some("2025-06-23"));
    assert_eq!(rows[0].get("total"), Some("300.00"));
    assert_eq!(rows[0].get("status"), Some("PENDING"));
    assert_eq!(rows[0].get("original_check_in"), Some("2025-06-10"));
    assert_eq!(rows[0].get("original_check_out"), Some("2025-06-14"));
    assert!(rows[0].get("modified_at").is_some());

    // The vacated dates are bookable again
    let rows = data_rows(
        guest
            .simple_query(&format!(
                "SELECT * FROM availability WHERE room_id = '{room_id}' \
                 AND check_in = '2025-06-10' AND check_out = '2025-06-14'"
            ))
            .await
            .unwrap(),
    );
    assert_eq!(rows[0].get("available"), Some("t"));
}

#[tokio::test]
async fn bad_dates_report_invalid_datetime_format() {
    let (addr, _engine) = start_test_server().await;
    let (room_id, _owner_client) = setup_room(addr, Ulid::new()).await;
    let guest = connect(addr, &Ulid::new().to_string()).await;

    // Nonexistent day
    let err = guest
        .batch_execute(&format!(
            "INSERT INTO bookings (id, room_id, check_in, check_out) \
             VALUES ('{}', '{room_id}', '2025-06-32', '2025-07-02')",
            Ulid::new()
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::INVALID_DATETIME_FORMAT));

    // Degenerate range: checkout on or before check-in
    let err = guest
        .batch_execute(&format!(
            "INSERT INTO bookings (id, room_id, check_in, check_out) \
             VALUES ('{}', '{room_id}', '2025-06-10', '2025-06-10')",
            Ulid::new()
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::INVALID_DATETIME_FORMAT));

    // Month token out of range
    let err = guest
        .simple_query(&format!(
            "SELECT * FROM calendar WHERE room_id = '{room_id}' AND month = '2025-13'"
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::INVALID_DATETIME_FORMAT));
}

#[tokio::test]
async fn missing_rows_versus_missing_room() {
    let (addr, _engine) = start_test_server().await;
    let (_room_id, owner_client) = setup_room(addr, Ulid::new()).await;

    // SELECT with an unknown id returns zero rows
    let rows = data_rows(
        owner_client
            .simple_query(&format!("SELECT * FROM rooms WHERE id = '{}'", Ulid::new()))
            .await
            .unwrap(),
    );
    assert!(rows.is_empty());

    // But a calendar for an unknown room is an error
    let err = owner_client
        .simple_query(&format!(
            "SELECT * FROM calendar WHERE room_id = '{}' AND month = '2025-06'",
            Ulid::new()
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::NO_DATA_FOUND));
}

#[tokio::test]
async fn duplicate_room_id_is_rejected() {
    let (addr, _engine) = start_test_server().await;
    let owner = Ulid::new();
    let (room_id, owner_client) = setup_room(addr, owner).await;

    let err = owner_client
        .batch_execute(&format!(
            "INSERT INTO rooms (id, hotel_id, name, base_rate) \
             VALUES ('{room_id}', '{}', '102', 90.00)",
            Ulid::new()
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::UNIQUE_VIOLATION));
}

#[tokio::test]
async fn session_user_must_be_a_ulid() {
    let (addr, _engine) = start_test_server().await;

    let client = connect(addr, "alice").await;
    let err = client.simple_query("SELECT * FROM rooms").await.unwrap_err();
    assert_eq!(
        err.code(),
        Some(&SqlState::INVALID_AUTHORIZATION_SPECIFICATION)
    );
}

#[tokio::test]
async fn closed_room_stops_new_bookings() {
    let (addr, _engine) = start_test_server().await;
    let (room_id, owner_client) = setup_room(addr, Ulid::new()).await;

    owner_client
        .batch_execute(&format!("UPDATE rooms SET open = false WHERE id = '{room_id}'"))
        .await
        .unwrap();

    let guest = connect(addr, &Ulid::new().to_string()).await;
    let err = guest
        .batch_execute(&format!(
            "INSERT INTO bookings (id, room_id, check_in, check_out) \
             VALUES ('{}', '{room_id}', '2025-06-10', '2025-06-12')",
            Ulid::new()
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::OBJECT_IN_USE));

    // The room still lists, flagged closed
    let rows = data_rows(
        guest
            .simple_query(&format!("SELECT * FROM rooms WHERE id = '{room_id}'"))
            .await
            .unwrap(),
    );
    assert_eq!(rows[0].get("open"), Some("f"));
}

#[tokio::test]
async fn guest_listing_spans_rooms() {
    let (addr, _engine) = start_test_server().await;
    let owner = Ulid::new();
    let (room_a, owner_client) = setup_room(addr, owner).await;
    let room_b = Ulid::new();
    owner_client
        .batch_execute(&format!(
            "INSERT INTO rooms (id, hotel_id, name, base_rate) \
             VALUES ('{room_b}', '{}', '102', 80.00)",
            Ulid::new()
        ))
        .await
        .unwrap();

    let guest = Ulid::new();
    let client = connect(addr, &guest.to_string()).await;
    for (room, check_in, check_out) in [
        (room_b, "2025-07-01", "2025-07-03"),
        (room_a, "2025-06-10", "2025-06-12"),
    ] {
        client
            .batch_execute(&format!(
                "INSERT INTO bookings (id, room_id, check_in, check_out) \
                 VALUES ('{}', '{room}', '{check_in}', '{check_out}')",
                Ulid::new()
            ))
            .await
            .unwrap();
    }

    // Sorted by check-in, each row carrying its room
    let rows = data_rows(
        client
            .simple_query(&format!(
                "SELECT * FROM bookings WHERE guest_id = '{guest}'"
            ))
            .await
            .unwrap(),
    );
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("check_in"), Some("2025-06-10"));
    assert_eq!(rows[0].get("room_id"), Some(room_a.to_string().as_str()));
    assert_eq!(rows[1].get("check_in"), Some("2025-07-01"));
    assert_eq!(rows[1].get("room_id"), Some(room_b.to_string().as_str()));
}
