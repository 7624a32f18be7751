//! Hierarchy store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs for the knowledge_area/topic two-table tree.
//! - Keep SQL details and ordering behavior inside the repository boundary.
//! - Surface constraint failures as semantic errors the service can map.
//!
//! # Invariants
//! - Child listings are deterministic: areas before topics, `name ASC` each.
//! - Same-table sibling-name uniqueness is guaranteed by unique indexes;
//!   the cross-table half is the service layer's job and is out of reach
//!   of this module.
//! - A foreign-key failure while deleting means dependents exist and is
//!   reported as `RestrictViolation`, never as a transport error.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::area::{Area, AreaId, AreaSummary};
use crate::model::topic::{Topic, TopicId};
use crate::model::ChildKind;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by hierarchy repository operations.
pub type HierarchyRepoResult<T> = Result<T, HierarchyRepoError>;

/// Errors from hierarchy repository operations.
#[derive(Debug)]
pub enum HierarchyRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target knowledge area does not exist.
    AreaNotFound(AreaId),
    /// Target topic does not exist.
    TopicNotFound(TopicId),
    /// A same-table sibling with the same name already exists.
    UniqueViolation,
    /// A referenced parent/area id does not exist.
    ForeignKeyViolation,
    /// Deletion was blocked because dependents exist.
    RestrictViolation(AreaId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for HierarchyRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::AreaNotFound(id) => write!(f, "knowledge area not found: {id}"),
            Self::TopicNotFound(id) => write!(f, "topic not found: {id}"),
            Self::UniqueViolation => write!(f, "sibling name already taken"),
            Self::ForeignKeyViolation => write!(f, "referenced knowledge area does not exist"),
            Self::RestrictViolation(id) => {
                write!(f, "knowledge area {id} cannot be deleted while it has children")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "hierarchy repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "hierarchy repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid hierarchy data: {message}"),
        }
    }
}

impl Error for HierarchyRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for HierarchyRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for HierarchyRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One child of a knowledge area, regardless of which table it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyChild {
    /// Surrogate key in the child's own table.
    pub id: i64,
    /// User-facing name.
    pub name: String,
    /// Which table the child came from.
    pub kind: ChildKind,
}

/// Query options for listing topics.
#[derive(Debug, Clone, Default)]
pub struct TopicListQuery {
    /// Restrict to topics under one knowledge area.
    pub area_id: Option<AreaId>,
    /// Prefix match on topic name.
    pub name_prefix: Option<String>,
}

/// Repository interface for the two-table hierarchy store.
///
/// This is the only contract the consistency layer relies on; any storage
/// engine exposing these operations is substitutable.
pub trait HierarchyRepository {
    /// Creates one knowledge area under an optional parent.
    fn create_area(&self, name: &str, parent_id: Option<AreaId>) -> HierarchyRepoResult<AreaId>;
    /// Renames and/or moves one knowledge area.
    fn rename_or_move_area(
        &self,
        id: AreaId,
        name: &str,
        new_parent_id: Option<AreaId>,
    ) -> HierarchyRepoResult<()>;
    /// Deletes one childless knowledge area.
    fn delete_area(&self, id: AreaId) -> HierarchyRepoResult<()>;
    /// Loads one knowledge area by id.
    fn get_area(&self, id: AreaId) -> HierarchyRepoResult<Option<Area>>;
    /// Lists top-level areas, optionally filtered by name substring.
    fn list_top_level_areas(
        &self,
        name_filter: Option<&str>,
    ) -> HierarchyRepoResult<Vec<AreaSummary>>;
    /// Lists area and topic children of one area, optionally filtered.
    fn list_children(
        &self,
        area_id: AreaId,
        name_filter: Option<&str>,
        kind_filter: Option<ChildKind>,
    ) -> HierarchyRepoResult<Vec<HierarchyChild>>;
    /// Finds a child area by exact name under an optional parent.
    fn find_child_area(
        &self,
        parent_id: Option<AreaId>,
        name: &str,
    ) -> HierarchyRepoResult<Option<AreaId>>;
    /// Finds a child topic by exact name under one area.
    fn find_child_topic(&self, area_id: AreaId, name: &str)
        -> HierarchyRepoResult<Option<TopicId>>;
    /// Counts area and topic children of one area.
    fn count_children(&self, area_id: AreaId) -> HierarchyRepoResult<u64>;
    /// Creates one topic under one knowledge area.
    fn create_topic(&self, name: &str, area_id: AreaId) -> HierarchyRepoResult<TopicId>;
    /// Renames and/or moves one topic.
    fn rename_or_move_topic(
        &self,
        id: TopicId,
        name: &str,
        area_id: AreaId,
    ) -> HierarchyRepoResult<()>;
    /// Deletes one topic.
    fn delete_topic(&self, id: TopicId) -> HierarchyRepoResult<()>;
    /// Loads one topic by id.
    fn get_topic(&self, id: TopicId) -> HierarchyRepoResult<Option<Topic>>;
    /// Lists topics using filter options.
    fn list_topics(&self, query: &TopicListQuery) -> HierarchyRepoResult<Vec<Topic>>;
}

/// SQLite-backed hierarchy repository.
#[derive(Debug)]
pub struct SqliteHierarchyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHierarchyRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> HierarchyRepoResult<Self> {
        ensure_hierarchy_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl HierarchyRepository for SqliteHierarchyRepository<'_> {
    fn create_area(&self, name: &str, parent_id: Option<AreaId>) -> HierarchyRepoResult<AreaId> {
        self.conn
            .execute(
                "INSERT INTO knowledge_area (name, parent_id) VALUES (?1, ?2);",
                params![name, parent_id],
            )
            .map_err(map_constraint_error)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn rename_or_move_area(
        &self,
        id: AreaId,
        name: &str,
        new_parent_id: Option<AreaId>,
    ) -> HierarchyRepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE knowledge_area
                 SET name = ?2,
                     parent_id = ?3
                 WHERE id = ?1;",
                params![id, name, new_parent_id],
            )
            .map_err(map_constraint_error)?;
        if changed == 0 {
            return Err(HierarchyRepoError::AreaNotFound(id));
        }
        Ok(())
    }

    fn delete_area(&self, id: AreaId) -> HierarchyRepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM knowledge_area WHERE id = ?1;", [id])
            .map_err(|err| map_delete_error(err, id))?;
        if changed == 0 {
            return Err(HierarchyRepoError::AreaNotFound(id));
        }
        Ok(())
    }

    fn get_area(&self, id: AreaId) -> HierarchyRepoResult<Option<Area>> {
        let area = self
            .conn
            .query_row(
                "SELECT id, name, parent_id FROM knowledge_area WHERE id = ?1;",
                [id],
                parse_area_row,
            )
            .optional()?;
        Ok(area)
    }

    fn list_top_level_areas(
        &self,
        name_filter: Option<&str>,
    ) -> HierarchyRepoResult<Vec<AreaSummary>> {
        let filter = name_filter.unwrap_or("");
        let mut stmt = self.conn.prepare(
            "SELECT id, name
             FROM knowledge_area
             WHERE parent_id IS NULL
               AND name LIKE '%' || ?1 || '%'
             ORDER BY name ASC, id ASC;",
        )?;
        let mut rows = stmt.query([filter])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(AreaSummary {
                id: row.get(0)?,
                name: row.get(1)?,
            });
        }
        Ok(items)
    }

    fn list_children(
        &self,
        area_id: AreaId,
        name_filter: Option<&str>,
        kind_filter: Option<ChildKind>,
    ) -> HierarchyRepoResult<Vec<HierarchyChild>> {
        const AREA_CHILDREN_SQL: &str = "SELECT id, name, 'area' AS kind
             FROM knowledge_area
             WHERE parent_id = ?1
               AND name LIKE '%' || ?2 || '%'";
        const TOPIC_CHILDREN_SQL: &str = "SELECT id, name, 'topic' AS kind
             FROM topic
             WHERE area_id = ?1
               AND name LIKE '%' || ?2 || '%'";

        // Areas sort before topics; each group is name-ordered.
        let sql = match kind_filter {
            Some(ChildKind::Area) => format!("{AREA_CHILDREN_SQL} ORDER BY name ASC, id ASC;"),
            Some(ChildKind::Topic) => format!("{TOPIC_CHILDREN_SQL} ORDER BY name ASC, id ASC;"),
            None => format!(
                "{AREA_CHILDREN_SQL} UNION ALL {TOPIC_CHILDREN_SQL}
                 ORDER BY kind ASC, name ASC, id ASC;"
            ),
        };

        let filter = name_filter.unwrap_or("");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![area_id, filter])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_child_row(row)?);
        }
        Ok(items)
    }

    fn find_child_area(
        &self,
        parent_id: Option<AreaId>,
        name: &str,
    ) -> HierarchyRepoResult<Option<AreaId>> {
        let id = self
            .conn
            .query_row(
                "SELECT id
                 FROM knowledge_area
                 WHERE COALESCE(parent_id, 0) = COALESCE(?1, 0)
                   AND name = ?2;",
                params![parent_id, name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn find_child_topic(
        &self,
        area_id: AreaId,
        name: &str,
    ) -> HierarchyRepoResult<Option<TopicId>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM topic WHERE area_id = ?1 AND name = ?2;",
                params![area_id, name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn count_children(&self, area_id: AreaId) -> HierarchyRepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT (SELECT COUNT(*) FROM knowledge_area WHERE parent_id = ?1)
                  + (SELECT COUNT(*) FROM topic WHERE area_id = ?1);",
            [area_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn create_topic(&self, name: &str, area_id: AreaId) -> HierarchyRepoResult<TopicId> {
        self.conn
            .execute(
                "INSERT INTO topic (name, area_id) VALUES (?1, ?2);",
                params![name, area_id],
            )
            .map_err(map_constraint_error)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn rename_or_move_topic(
        &self,
        id: TopicId,
        name: &str,
        area_id: AreaId,
    ) -> HierarchyRepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE topic
                 SET name = ?2,
                     area_id = ?3
                 WHERE id = ?1;",
                params![id, name, area_id],
            )
            .map_err(map_constraint_error)?;
        if changed == 0 {
            return Err(HierarchyRepoError::TopicNotFound(id));
        }
        Ok(())
    }

    fn delete_topic(&self, id: TopicId) -> HierarchyRepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM topic WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(HierarchyRepoError::TopicNotFound(id));
        }
        Ok(())
    }

    fn get_topic(&self, id: TopicId) -> HierarchyRepoResult<Option<Topic>> {
        let topic = self
            .conn
            .query_row(
                "SELECT id, name, area_id FROM topic WHERE id = ?1;",
                [id],
                parse_topic_row,
            )
            .optional()?;
        Ok(topic)
    }

    fn list_topics(&self, query: &TopicListQuery) -> HierarchyRepoResult<Vec<Topic>> {
        let mut sql = "SELECT id, name, area_id FROM topic WHERE 1 = 1".to_string();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(area_id) = query.area_id {
            sql.push_str(" AND area_id = ?");
            bind_values.push(Value::Integer(area_id));
        }

        if let Some(prefix) = query.name_prefix.as_deref() {
            sql.push_str(" AND name LIKE ? || '%'");
            bind_values.push(Value::Text(prefix.to_string()));
        }

        sql.push_str(" ORDER BY name ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut topics = Vec::new();
        while let Some(row) = rows.next()? {
            topics.push(parse_topic_row(row)?);
        }
        Ok(topics)
    }
}

fn parse_area_row(row: &Row<'_>) -> rusqlite::Result<Area> {
    Ok(Area {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
    })
}

fn parse_topic_row(row: &Row<'_>) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: row.get(0)?,
        name: row.get(1)?,
        area_id: row.get(2)?,
    })
}

fn parse_child_row(row: &Row<'_>) -> HierarchyRepoResult<HierarchyChild> {
    let kind_text: String = row.get("kind")?;
    let kind = match kind_text.as_str() {
        "area" => ChildKind::Area,
        "topic" => ChildKind::Topic,
        other => {
            return Err(HierarchyRepoError::InvalidData(format!(
                "invalid child kind `{other}` in hierarchy listing"
            )));
        }
    };
    Ok(HierarchyChild {
        id: row.get("id")?,
        name: row.get("name")?,
        kind,
    })
}

/// Maps SQLite constraint failures on insert/update paths.
fn map_constraint_error(err: rusqlite::Error) -> HierarchyRepoError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        match failure.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => return HierarchyRepoError::UniqueViolation,
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                return HierarchyRepoError::ForeignKeyViolation;
            }
            _ => {}
        }
    }
    HierarchyRepoError::Db(DbError::Sqlite(err))
}

/// Maps SQLite constraint failures on the delete path, where a foreign-key
/// failure means dependents exist.
fn map_delete_error(err: rusqlite::Error, id: AreaId) -> HierarchyRepoError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
            || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_TRIGGER
        {
            return HierarchyRepoError::RestrictViolation(id);
        }
    }
    HierarchyRepoError::Db(DbError::Sqlite(err))
}

fn ensure_hierarchy_connection_ready(conn: &Connection) -> HierarchyRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(HierarchyRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["knowledge_area", "topic"] {
        if !table_exists(conn, table)? {
            return Err(HierarchyRepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> HierarchyRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
