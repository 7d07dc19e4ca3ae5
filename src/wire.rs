use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use futures::Sink;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use pgwire::tokio::{process_socket, TlsAcceptor};
use tokio::net::TcpStream;
use ulid::Ulid;

use crate::auth::VacancyAuthSource;
use crate::engine::{Engine, EngineError};
use crate::model::*;
use crate::sql::{self, Command, SqlError};

pub struct VacancyHandler {
    engine: Arc<Engine>,
    query_parser: Arc<VacancyQueryParser>,
}

impl VacancyHandler {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            query_parser: Arc::new(VacancyQueryParser),
        }
    }

    /// The acting platform user, taken from the startup `user` parameter.
    /// Owner and guest checks downstream all key off this identity.
    fn session_user<C: ClientInfo>(client: &C) -> PgWireResult<Ulid> {
        match client
            .metadata()
            .get("user")
            .and_then(|u| Ulid::from_string(u).ok())
        {
            Some(id) => Ok(id),
            None => {
                metrics::counter!(crate::observability::AUTH_FAILURES_TOTAL).increment(1);
                Err(PgWireError::UserError(Box::new(ErrorInfo::new(
                    "ERROR".into(),
                    "28000".into(),
                    "session user missing or not a ULID".into(),
                ))))
            }
        }
    }

    async fn execute_command(&self, actor: Ulid, cmd: Command) -> PgWireResult<Vec<Response>> {
        match cmd {
            Command::InsertRoom {
                id,
                hotel_id,
                name,
                base_rate,
                capacity,
            } => {
                self.engine
                    .register_room(id, hotel_id, actor, name, base_rate, capacity)
                    .await
                    .map_err(engine_err)?;
                metrics::gauge!(crate::observability::ROOMS_ACTIVE)
                    .set(self.engine.rooms.len() as f64);
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdateRoom {
                id,
                base_rate,
                capacity,
                open,
            } => {
                self.engine
                    .update_room(actor, id, base_rate, capacity, open)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::InsertBooking {
                id,
                room_id,
                check_in,
                check_out,
            } => {
                self.engine
                    .create_booking(actor, id, room_id, check_in, check_out)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::CancelBooking { id, reason } => {
                self.engine
                    .cancel_booking(actor, id, reason)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::ConfirmBooking { id } => {
                self.engine
                    .confirm_booking(actor, id)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::CompleteBooking { id } => {
                self.engine
                    .complete_booking(actor, id)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::RescheduleBooking {
                id,
                check_in,
                check_out,
            } => {
                self.engine
                    .reschedule_booking(actor, id, check_in, check_out)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::InsertBlock {
                id,
                room_id,
                start_date,
                end_date,
                reason,
                note,
            } => {
                self.engine
                    .add_block(actor, id, room_id, start_date, end_date, reason, note)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::DeleteBlock { id } => {
                self.engine
                    .remove_block(actor, id)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::InsertSeason {
                id,
                room_id,
                start_date,
                end_date,
                rate,
                label,
            } => {
                self.engine
                    .add_season(actor, id, room_id, start_date, end_date, rate, label)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::DeleteSeason { id } => {
                self.engine
                    .remove_season(actor, id)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::SelectRooms { id } => {
                // A SELECT for an unknown id returns zero rows, not an error
                let rooms = match id {
                    Some(id) => match self.engine.get_room_info(id).await {
                        Ok(info) => vec![info],
                        Err(EngineError::NotFound(_)) => vec![],
                        Err(e) => return Err(engine_err(e)),
                    },
                    None => self.engine.list_rooms().await,
                };

                let schema = Arc::new(rooms_schema());
                let rows: Vec<PgWireResult<_>> = rooms
                    .into_iter()
                    .map(|r| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&r.id.to_string())?;
                        encoder.encode_field(&r.hotel_id.to_string())?;
                        encoder.encode_field(&r.owner_id.to_string())?;
                        encoder.encode_field(&r.name)?;
                        encoder.encode_field(&r.base_rate.to_string())?;
                        encoder.encode_field(&(r.capacity as i32))?;
                        encoder.encode_field(&r.open)?;
                        Ok(encoder.take_row())
                    })
                    .collect();

                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectBookings {
                id,
                room_id,
                guest_id,
            } => {
                let bookings = if let Some(id) = id {
                    match self.engine.get_booking(id).await {
                        Ok(b) => vec![b],
                        Err(EngineError::NotFound(_)) => vec![],
                        Err(e) => return Err(engine_err(e)),
                    }
                } else if let Some(room_id) = room_id {
                    self.engine.get_bookings(room_id).await.map_err(engine_err)?
                } else if let Some(guest_id) = guest_id {
                    self.engine.bookings_for_guest(guest_id).await
                } else {
                    // the parser requires at least one filter
                    vec![]
                };

                let schema = Arc::new(bookings_schema());
                let rows: Vec<PgWireResult<_>> = bookings
                    .into_iter()
                    .map(|b| {
                        let room = self
                            .engine
                            .get_room_for_entity(&b.id)
                            .map(|r| r.to_string());
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&b.id.to_string())?;
                        encoder.encode_field(&b.guest_id.to_string())?;
                        encoder.encode_field(&room)?;
                        encoder.encode_field(&b.stay.check_in.to_string())?;
                        encoder.encode_field(&b.stay.check_out.to_string())?;
                        encoder.encode_field(&b.total.to_string())?;
                        encoder.encode_field(&b.status.as_str())?;
                        encoder.encode_field(&b.cancelled_at)?;
                        encoder.encode_field(&b.cancellation_reason)?;
                        encoder.encode_field(&b.modified_at)?;
                        encoder.encode_field(&b.original_stay.map(|s| s.check_in.to_string()))?;
                        encoder.encode_field(&b.original_stay.map(|s| s.check_out.to_string()))?;
                        Ok(encoder.take_row())
                    })
                    .collect();

                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectBlocks { room_id } => {
                let blocks = self.engine.get_blocks(room_id).await.map_err(engine_err)?;
                let rid_str = room_id.to_string();

                let schema = Arc::new(blocks_schema());
                let rows: Vec<PgWireResult<_>> = blocks
                    .into_iter()
                    .map(|b| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&b.id.to_string())?;
                        encoder.encode_field(&rid_str)?;
                        encoder.encode_field(&b.range.start.to_string())?;
                        encoder.encode_field(&b.range.end.to_string())?;
                        encoder.encode_field(&b.reason.as_str())?;
                        encoder.encode_field(&b.note)?;
                        Ok(encoder.take_row())
                    })
                    .collect();

                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectSeasons { room_id } => {
                let seasons = self.engine.get_seasons(room_id).await.map_err(engine_err)?;
                let rid_str = room_id.to_string();

                let schema = Arc::new(seasons_schema());
                let rows: Vec<PgWireResult<_>> = seasons
                    .into_iter()
                    .map(|s| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&s.id.to_string())?;
                        encoder.encode_field(&rid_str)?;
                        encoder.encode_field(&s.range.start.to_string())?;
                        encoder.encode_field(&s.range.end.to_string())?;
                        encoder.encode_field(&s.rate.to_string())?;
                        encoder.encode_field(&s.label)?;
                        Ok(encoder.take_row())
                    })
                    .collect();

                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectCalendar {
                room_id,
                year,
                month,
            } => {
                let days = self
                    .engine
                    .monthly_calendar(room_id, year, month)
                    .await
                    .map_err(engine_err)?;

                let schema = Arc::new(calendar_schema());
                let rows: Vec<PgWireResult<_>> = days
                    .into_iter()
                    .map(|day| {
                        let status = match &day.status {
                            DayStatus::Open { .. } => "OPEN",
                            DayStatus::Booked => "BOOKED",
                            DayStatus::Blocked { .. } => "BLOCKED",
                        };
                        let note = match &day.status {
                            DayStatus::Blocked { reason } => Some(reason.as_str().to_string()),
                            DayStatus::Booked => None,
                            DayStatus::Open { season, .. } => season.clone(),
                        };
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&day.date.to_string())?;
                        encoder.encode_field(&status)?;
                        encoder.encode_field(&day.price().map(|p| p.to_string()))?;
                        encoder.encode_field(&note)?;
                        Ok(encoder.take_row())
                    })
                    .collect();

                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectAvailability {
                room_id,
                check_in,
                check_out,
            } => {
                let available = self
                    .engine
                    .is_bookable(room_id, check_in, check_out)
                    .await
                    .map_err(engine_err)?;

                let schema = Arc::new(availability_schema());
                let mut encoder = DataRowEncoder::new(schema.clone());
                encoder.encode_field(&room_id.to_string())?;
                encoder.encode_field(&check_in.to_string())?;
                encoder.encode_field(&check_out.to_string())?;
                encoder.encode_field(&available)?;
                let rows = vec![Ok(encoder.take_row())];

                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectQuote {
                room_id,
                check_in,
                check_out,
            } => {
                let quote = self
                    .engine
                    .quote_stay(room_id, check_in, check_out)
                    .await
                    .map_err(engine_err)?;

                let schema = Arc::new(quote_schema());
                let mut encoder = DataRowEncoder::new(schema.clone());
                encoder.encode_field(&quote.room_id.to_string())?;
                encoder.encode_field(&quote.stay.check_in.to_string())?;
                encoder.encode_field(&quote.stay.check_out.to_string())?;
                encoder.encode_field(&quote.nights)?;
                encoder.encode_field(&quote.total.to_string())?;
                let rows = vec![Ok(encoder.take_row())];

                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
        }
    }
}

// ── Result schemas ───────────────────────────────────────────────

fn text_field(name: &str, ty: Type) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, ty, FieldFormat::Text)
}

fn rooms_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id", Type::VARCHAR),
        text_field("hotel_id", Type::VARCHAR),
        text_field("owner_id", Type::VARCHAR),
        text_field("name", Type::VARCHAR),
        text_field("base_rate", Type::NUMERIC),
        text_field("capacity", Type::INT4),
        text_field("open", Type::BOOL),
    ]
}

fn bookings_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id", Type::VARCHAR),
        text_field("guest_id", Type::VARCHAR),
        text_field("room_id", Type::VARCHAR),
        text_field("check_in", Type::DATE),
        text_field("check_out", Type::DATE),
        text_field("total", Type::NUMERIC),
        text_field("status", Type::VARCHAR),
        text_field("cancelled_at", Type::INT8),
        text_field("cancellation_reason", Type::VARCHAR),
        text_field("modified_at", Type::INT8),
        text_field("original_check_in", Type::DATE),
        text_field("original_check_out", Type::DATE),
    ]
}

fn blocks_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id", Type::VARCHAR),
        text_field("room_id", Type::VARCHAR),
        text_field("start_date", Type::DATE),
        text_field("end_date", Type::DATE),
        text_field("reason", Type::VARCHAR),
        text_field("note", Type::VARCHAR),
    ]
}

fn seasons_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id", Type::VARCHAR),
        text_field("room_id", Type::VARCHAR),
        text_field("start_date", Type::DATE),
        text_field("end_date", Type::DATE),
        text_field("rate", Type::NUMERIC),
        text_field("label", Type::VARCHAR),
    ]
}

fn calendar_schema() -> Vec<FieldInfo> {
    vec![
        text_field("date", Type::DATE),
        text_field("status", Type::VARCHAR),
        text_field("price", Type::NUMERIC),
        text_field("note", Type::VARCHAR),
    ]
}

fn availability_schema() -> Vec<FieldInfo> {
    vec![
        text_field("room_id", Type::VARCHAR),
        text_field("check_in", Type::DATE),
        text_field("check_out", Type::DATE),
        text_field("available", Type::BOOL),
    ]
}

fn quote_schema() -> Vec<FieldInfo> {
    vec![
        text_field("room_id", Type::VARCHAR),
        text_field("check_in", Type::DATE),
        text_field("check_out", Type::DATE),
        text_field("nights", Type::INT8),
        text_field("total", Type::NUMERIC),
    ]
}

/// Sniff the result schema from raw SQL, for Describe before Execute.
/// Filter columns like `room_id` do not collide with the table names.
fn schema_for_sql(sql: &str) -> Vec<FieldInfo> {
    let upper = sql.to_uppercase();
    if !upper.contains("SELECT") {
        return vec![];
    }
    if upper.contains("CALENDAR") {
        calendar_schema()
    } else if upper.contains("AVAILABILITY") {
        availability_schema()
    } else if upper.contains("QUOTE") {
        quote_schema()
    } else if upper.contains("BOOKINGS") {
        bookings_schema()
    } else if upper.contains("BLOCKS") {
        blocks_schema()
    } else if upper.contains("SEASONS") {
        seasons_schema()
    } else if upper.contains("ROOMS") {
        rooms_schema()
    } else {
        vec![]
    }
}

#[async_trait]
impl SimpleQueryHandler for VacancyHandler {
    async fn do_query<C>(
        &self,
        client: &mut C,
        query: &str,
    ) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let actor = Self::session_user(client)?;
        let cmd = sql::parse_sql(query).map_err(sql_err)?;
        let label = crate::observability::command_label(&cmd);

        let started = std::time::Instant::now();
        let result = self.execute_command(actor, cmd).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(
            crate::observability::QUERIES_TOTAL,
            "command" => label,
            "status" => status
        )
        .increment(1);
        metrics::histogram!(crate::observability::QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        result
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct VacancyQueryParser;

#[async_trait]
impl QueryParser for VacancyQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(schema_for_sql(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for VacancyHandler {
    type Statement = String;
    type QueryParser = VacancyQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let actor = Self::session_user(client)?;
        let sql = substitute_params(portal);
        let cmd = sql::parse_sql(&sql).map_err(sql_err)?;
        let label = crate::observability::command_label(&cmd);

        let started = std::time::Instant::now();
        let result = self.execute_command(actor, cmd).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(
            crate::observability::QUERIES_TOTAL,
            "command" => label,
            "status" => status
        )
        .increment(1);
        metrics::histogram!(crate::observability::QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());

        let mut responses = result?;
        Ok(responses.remove(0))
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            schema_for_sql(&target.statement),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(schema_for_sql(
            &target.statement.statement,
        )))
    }
}

/// Count the highest $N parameter placeholder in the SQL string.
fn count_params(sql: &str) -> usize {
    let mut max = 0usize;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i > start {
                if let Ok(n) = sql[start..i].parse::<usize>() {
                    if n > max {
                        max = n;
                    }
                }
            }
        } else {
            i += 1;
        }
    }
    max
}

/// Substitute $1, $2, ... placeholders with bound parameter values (text format).
fn substitute_params(portal: &Portal<String>) -> String {
    let sql = portal.statement.statement.to_string();
    let params = &portal.parameters;
    let mut result = sql;

    for (i, param) in params.iter().enumerate().rev() {
        let placeholder = format!("${}", i + 1);
        let value = match param {
            Some(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                format!("'{}'", text.replace('\'', "''"))
            }
            None => "NULL".to_string(),
        };
        result = result.replace(&placeholder, &value);
    }

    result
}

// ── Factory ──────────────────────────────────────────────────────

pub struct VacancyFactory {
    handler: Arc<VacancyHandler>,
    auth_handler:
        Arc<CleartextPasswordAuthStartupHandler<VacancyAuthSource, DefaultServerParameterProvider>>,
    noop: Arc<NoopHandler>,
}

impl VacancyFactory {
    pub fn new(engine: Arc<Engine>, password: String) -> Self {
        let auth_source = VacancyAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(VacancyHandler::new(engine)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for VacancyFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one client socket to completion.
pub async fn process_connection(
    socket: TcpStream,
    engine: Arc<Engine>,
    password: String,
    tls_acceptor: Option<TlsAcceptor>,
) -> std::io::Result<()> {
    let factory = VacancyFactory::new(engine, password);
    process_socket(socket, tls_acceptor, factory).await
}

/// Engine failures surface as the closest matching SQLSTATE.
fn engine_err(e: EngineError) -> PgWireError {
    let code = match &e {
        EngineError::NotFound(_) => "P0002",
        EngineError::AlreadyExists(_) => "23505",
        EngineError::Forbidden(_) => "42501",
        EngineError::Conflict { .. } => "23P01",
        EngineError::InvalidRange { .. } => "22007",
        EngineError::InvalidState { .. } => "55000",
        EngineError::RoomClosed(_) => "55006",
        EngineError::InvalidRate(_) => "22003",
        EngineError::LimitExceeded(_) => "54000",
        EngineError::WalError(_) => "58030",
    };
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        e.to_string(),
    )))
}

fn sql_err(e: SqlError) -> PgWireError {
    let code = match &e {
        SqlError::BadDate(_) => "22007",
        SqlError::UnknownColumn(_) => "42703",
        _ => "42601",
    };
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        e.to_string(),
    )))
}
