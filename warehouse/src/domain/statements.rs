//! Statement catalog for the staging and dimensional schema.
//!
//! Owns every piece of SQL the pipeline executes: drop and create statements
//! for the seven relations, bulk-load builders for the two staging tables,
//! and the five insert-from-select transforms. The catalog is dialect-aware:
//! [`Dialect::Redshift`] emits the production physical design (identity
//! column, sort and distribution keys), while [`Dialect::Postgres`] emits
//! the same logical schema for integration testing against stock PostgreSQL.
//!
//! The bulk-load statements are the only ones carrying runtime values. The
//! engine cannot bind parameters inside `COPY`, so the builders take
//! validated [`SourceLocation`]s and escape every interpolated literal;
//! everything else is static text.

use crate::domain::ports::Statement;
use crate::domain::source::SourceLocation;

/// SQL dialect the catalog emits DDL for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Production warehouse engine with physical table design.
    Redshift,
    /// Stock PostgreSQL, used by integration tests.
    Postgres,
}

/// Catalog of schema and transform statements for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct SchemaCatalog {
    dialect: Dialect,
}

/// Relations in declaration order: staging first, then fact, then dimensions.
const RELATIONS: [&str; 7] = [
    "staging_events",
    "staging_songs",
    "songplays",
    "users",
    "songs",
    "artists",
    "time",
];

impl SchemaCatalog {
    /// Build a catalog for the given dialect.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Drop statements for all seven relations, guarded by `IF EXISTS` so a
    /// fresh database is valid input.
    #[must_use]
    pub fn drop_statements(&self) -> Vec<Statement> {
        RELATIONS
            .iter()
            .zip([
                "drop staging_events",
                "drop staging_songs",
                "drop songplays",
                "drop users",
                "drop songs",
                "drop artists",
                "drop time",
            ])
            .map(|(relation, name)| {
                Statement::new(name, format!("DROP TABLE IF EXISTS {relation};"))
            })
            .collect()
    }

    /// Create statements in declaration order (staging, fact, dimensions).
    #[must_use]
    pub fn create_statements(&self) -> Vec<Statement> {
        vec![
            self.create_staging_events(),
            self.create_staging_songs(),
            self.create_songplays(),
            self.create_users(),
            self.create_songs(),
            self.create_artists(),
            self.create_time(),
        ]
    }

    /// Transform statements in fixed order: the fact table first, then the
    /// four dimensions. The order carries no semantic dependency, since
    /// every transform reads only staging relations, but is fixed for
    /// reproducibility.
    #[must_use]
    pub fn transform_statements(&self) -> Vec<Statement> {
        vec![
            insert_songplays(),
            insert_users(),
            insert_songs(),
            insert_artists(),
            insert_time(),
        ]
    }

    fn sortkey(&self) -> &'static str {
        match self.dialect {
            Dialect::Redshift => " sortkey",
            Dialect::Postgres => "",
        }
    }

    fn distkey(&self) -> &'static str {
        match self.dialect {
            Dialect::Redshift => " distkey",
            Dialect::Postgres => "",
        }
    }

    fn identity(&self) -> &'static str {
        match self.dialect {
            Dialect::Redshift => "integer identity(0,1)",
            Dialect::Postgres => "integer generated by default as identity",
        }
    }

    fn create_staging_events(&self) -> Statement {
        // Column order matters: the events JSONPaths document maps fields
        // positionally.
        let sort = self.sortkey();
        Statement::new(
            "create staging_events",
            format!(
                "CREATE TABLE IF NOT EXISTS staging_events (\n\
                 \x20   artist varchar,\n\
                 \x20   auth varchar,\n\
                 \x20   first_name varchar,\n\
                 \x20   gender char,\n\
                 \x20   item_in_session integer,\n\
                 \x20   last_name varchar,\n\
                 \x20   length numeric,\n\
                 \x20   level varchar,\n\
                 \x20   location varchar,\n\
                 \x20   method varchar,\n\
                 \x20   page varchar,\n\
                 \x20   registration numeric,\n\
                 \x20   session_id integer{sort},\n\
                 \x20   song varchar,\n\
                 \x20   status integer,\n\
                 \x20   ts bigint,\n\
                 \x20   user_agent varchar,\n\
                 \x20   user_id integer\n\
                 );"
            ),
        )
    }

    fn create_staging_songs(&self) -> Statement {
        // Column names mirror the song JSON fields: automatic field mapping
        // matches on name during bulk load.
        let sort = self.sortkey();
        Statement::new(
            "create staging_songs",
            format!(
                "CREATE TABLE IF NOT EXISTS staging_songs (\n\
                 \x20   num_songs integer,\n\
                 \x20   artist_id varchar,\n\
                 \x20   artist_latitude numeric,\n\
                 \x20   artist_longitude numeric,\n\
                 \x20   artist_location varchar,\n\
                 \x20   artist_name varchar,\n\
                 \x20   song_id varchar{sort},\n\
                 \x20   title varchar,\n\
                 \x20   duration numeric,\n\
                 \x20   year integer\n\
                 );"
            ),
        )
    }

    fn create_songplays(&self) -> Statement {
        let identity = self.identity();
        let sort = self.sortkey();
        Statement::new(
            "create songplays",
            format!(
                "CREATE TABLE IF NOT EXISTS songplays (\n\
                 \x20   songplay_id {identity} primary key,\n\
                 \x20   start_time timestamp not null{sort},\n\
                 \x20   user_id integer not null,\n\
                 \x20   level varchar,\n\
                 \x20   song_id varchar,\n\
                 \x20   artist_id varchar,\n\
                 \x20   session_id integer not null,\n\
                 \x20   location varchar,\n\
                 \x20   user_agent varchar\n\
                 );"
            ),
        )
    }

    fn create_users(&self) -> Statement {
        let sort = self.sortkey();
        let dist = self.distkey();
        Statement::new(
            "create users",
            format!(
                "CREATE TABLE IF NOT EXISTS users (\n\
                 \x20   user_id integer primary key{sort},\n\
                 \x20   first_name varchar,\n\
                 \x20   last_name varchar,\n\
                 \x20   gender char,\n\
                 \x20   level varchar{dist}\n\
                 );"
            ),
        )
    }

    fn create_songs(&self) -> Statement {
        let sort = self.sortkey();
        let dist = self.distkey();
        Statement::new(
            "create songs",
            format!(
                "CREATE TABLE IF NOT EXISTS songs (\n\
                 \x20   song_id varchar primary key{sort},\n\
                 \x20   title varchar not null,\n\
                 \x20   artist_id varchar not null,\n\
                 \x20   year integer{dist},\n\
                 \x20   duration numeric\n\
                 );"
            ),
        )
    }

    fn create_artists(&self) -> Statement {
        let sort = self.sortkey();
        let dist = self.distkey();
        Statement::new(
            "create artists",
            format!(
                "CREATE TABLE IF NOT EXISTS artists (\n\
                 \x20   artist_id varchar{sort},\n\
                 \x20   name varchar not null,\n\
                 \x20   location varchar{dist},\n\
                 \x20   latitude numeric,\n\
                 \x20   longitude numeric\n\
                 );"
            ),
        )
    }

    fn create_time(&self) -> Statement {
        let sort = self.sortkey();
        let dist = self.distkey();
        Statement::new(
            "create time",
            format!(
                "CREATE TABLE IF NOT EXISTS time (\n\
                 \x20   start_time timestamp primary key{sort}{dist},\n\
                 \x20   hour integer,\n\
                 \x20   day integer,\n\
                 \x20   week integer,\n\
                 \x20   month integer,\n\
                 \x20   year integer,\n\
                 \x20   weekday integer\n\
                 );"
            ),
        )
    }
}

/// Bulk-load statement for the events staging table.
///
/// Events files need an explicit JSONPaths document because their field
/// names do not line up with the staging columns.
#[must_use]
pub fn copy_staging_events(
    source: &SourceLocation,
    jsonpaths: &SourceLocation,
    role_arn: &str,
    region: &str,
) -> Statement {
    Statement::new(
        "copy staging_events",
        format!(
            "COPY staging_events FROM {source}\n\
             IAM_ROLE {role}\n\
             REGION {region}\n\
             FORMAT AS JSON {jsonpaths};",
            source = quote_literal(source.as_str()),
            role = quote_literal(role_arn),
            region = quote_literal(region),
            jsonpaths = quote_literal(jsonpaths.as_str()),
        ),
    )
}

/// Bulk-load statement for the songs staging table.
///
/// Song files use automatic field mapping: their JSON field names match the
/// staging columns.
#[must_use]
pub fn copy_staging_songs(source: &SourceLocation, role_arn: &str, region: &str) -> Statement {
    Statement::new(
        "copy staging_songs",
        format!(
            "COPY staging_songs FROM {source}\n\
             IAM_ROLE {role}\n\
             REGION {region}\n\
             FORMAT AS JSON 'auto';",
            source = quote_literal(source.as_str()),
            role = quote_literal(role_arn),
            region = quote_literal(region),
        ),
    )
}

/// Quote a value as a SQL string literal, doubling embedded quotes.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn insert_songplays() -> Statement {
    Statement::new(
        "insert songplays",
        "INSERT INTO songplays (start_time, user_id, level, song_id, artist_id, \
         session_id, location, user_agent)\n\
         SELECT\n\
         \x20   timestamp 'epoch' + e.ts / 1000 * interval '1 second' AS start_time,\n\
         \x20   e.user_id,\n\
         \x20   e.level,\n\
         \x20   s.song_id,\n\
         \x20   s.artist_id,\n\
         \x20   e.session_id,\n\
         \x20   e.location,\n\
         \x20   e.user_agent\n\
         FROM staging_events e\n\
         JOIN staging_songs s\n\
         \x20   ON s.artist_name = e.artist\n\
         \x20   AND s.title = e.song\n\
         WHERE e.page = 'NextSong';",
    )
}

fn insert_users() -> Statement {
    Statement::new(
        "insert users",
        "INSERT INTO users (user_id, first_name, last_name, gender, level)\n\
         SELECT DISTINCT user_id, first_name, last_name, gender, level\n\
         FROM staging_events\n\
         WHERE page = 'NextSong' AND user_id IS NOT NULL;",
    )
}

fn insert_songs() -> Statement {
    Statement::new(
        "insert songs",
        "INSERT INTO songs (song_id, title, artist_id, year, duration)\n\
         SELECT DISTINCT song_id, title, artist_id, year, duration\n\
         FROM staging_songs\n\
         WHERE song_id IS NOT NULL;",
    )
}

fn insert_artists() -> Statement {
    Statement::new(
        "insert artists",
        "INSERT INTO artists (artist_id, name, location, latitude, longitude)\n\
         SELECT DISTINCT artist_id, artist_name, artist_location, \
         artist_latitude, artist_longitude\n\
         FROM staging_songs\n\
         WHERE artist_id IS NOT NULL;",
    )
}

fn insert_time() -> Statement {
    Statement::new(
        "insert time",
        "INSERT INTO time (start_time, hour, day, week, month, year, weekday)\n\
         SELECT DISTINCT\n\
         \x20   timestamp 'epoch' + ts / 1000 * interval '1 second' AS start_time,\n\
         \x20   EXTRACT(hour FROM timestamp 'epoch' + ts / 1000 * interval '1 second'),\n\
         \x20   EXTRACT(day FROM timestamp 'epoch' + ts / 1000 * interval '1 second'),\n\
         \x20   EXTRACT(week FROM timestamp 'epoch' + ts / 1000 * interval '1 second'),\n\
         \x20   EXTRACT(month FROM timestamp 'epoch' + ts / 1000 * interval '1 second'),\n\
         \x20   EXTRACT(year FROM timestamp 'epoch' + ts / 1000 * interval '1 second'),\n\
         \x20   EXTRACT(dow FROM timestamp 'epoch' + ts / 1000 * interval '1 second')\n\
         FROM staging_events\n\
         WHERE page = 'NextSong' AND ts IS NOT NULL;",
    )
}

#[cfg(test)]
mod tests {
    //! Unit coverage for catalog shape, dialect handling, and escaping.

    use rstest::rstest;

    use super::*;

    #[rstest]
    fn catalog_declares_seven_drops_and_seven_creates() {
        let catalog = SchemaCatalog::new(Dialect::Redshift);
        assert_eq!(catalog.drop_statements().len(), 7);
        assert_eq!(catalog.create_statements().len(), 7);
    }

    #[rstest]
    fn drops_are_guarded_by_if_exists() {
        let catalog = SchemaCatalog::new(Dialect::Postgres);
        for statement in catalog.drop_statements() {
            assert!(
                statement.sql.starts_with("DROP TABLE IF EXISTS "),
                "unguarded drop: {}",
                statement.sql
            );
        }
    }

    #[rstest]
    fn transforms_run_fact_first_in_fixed_order() {
        let catalog = SchemaCatalog::new(Dialect::Redshift);
        let names: Vec<&str> = catalog
            .transform_statements()
            .iter()
            .map(|statement| statement.name)
            .collect();
        assert_eq!(
            names,
            [
                "insert songplays",
                "insert users",
                "insert songs",
                "insert artists",
                "insert time"
            ]
        );
    }

    #[rstest]
    fn redshift_dialect_emits_physical_table_design() {
        let catalog = SchemaCatalog::new(Dialect::Redshift);
        let ddl: String = catalog
            .create_statements()
            .iter()
            .map(|statement| statement.sql.clone())
            .collect();
        assert!(ddl.contains("identity(0,1)"));
        assert!(ddl.contains("sortkey"));
        assert!(ddl.contains("distkey"));
    }

    #[rstest]
    fn postgres_dialect_strips_physical_table_design() {
        let catalog = SchemaCatalog::new(Dialect::Postgres);
        let ddl: String = catalog
            .create_statements()
            .iter()
            .map(|statement| statement.sql.clone())
            .collect();
        assert!(ddl.contains("generated by default as identity"));
        assert!(!ddl.contains("sortkey"));
        assert!(!ddl.contains("distkey"));
    }

    #[rstest]
    fn fact_transform_joins_on_exact_name_and_title_and_filters_page() {
        let sql = insert_songplays().sql;
        assert!(sql.contains("s.artist_name = e.artist"));
        assert!(sql.contains("s.title = e.song"));
        assert!(sql.contains("WHERE e.page = 'NextSong'"));
        assert!(sql.contains("e.ts / 1000 * interval '1 second'"));
    }

    #[rstest]
    #[case(insert_users().sql, "user_id IS NOT NULL")]
    #[case(insert_songs().sql, "song_id IS NOT NULL")]
    #[case(insert_artists().sql, "artist_id IS NOT NULL")]
    #[case(insert_time().sql, "ts IS NOT NULL")]
    fn dimension_transforms_are_distinct_and_exclude_null_keys(
        #[case] sql: String,
        #[case] null_guard: &str,
    ) {
        assert!(sql.contains("SELECT DISTINCT"), "{sql}");
        assert!(sql.contains(null_guard), "{sql}");
    }

    #[rstest]
    fn copy_builders_escape_embedded_quotes() {
        let source = SourceLocation::parse("s3://data-lake/events").expect("valid");
        let statement = copy_staging_songs(&source, "arn:aws:iam::1:role/o'brien", "us-west-2");
        assert!(statement.sql.contains("'arn:aws:iam::1:role/o''brien'"));
    }

    #[rstest]
    fn events_copy_names_the_jsonpaths_document() {
        let source = SourceLocation::parse("s3://data-lake/events").expect("valid");
        let jsonpaths =
            SourceLocation::parse("s3://data-lake/events_jsonpaths.json").expect("valid");
        let statement = copy_staging_events(&source, &jsonpaths, "arn:aws:iam::1:role/r", "us-west-2");
        assert!(statement.sql.contains("FORMAT AS JSON 's3://data-lake/events_jsonpaths.json'"));
        assert!(statement.sql.contains("COPY staging_events FROM 's3://data-lake/events'"));
    }

    #[rstest]
    fn songs_copy_uses_automatic_field_mapping() {
        let source = SourceLocation::parse("s3://data-lake/songs").expect("valid");
        let statement = copy_staging_songs(&source, "arn:aws:iam::1:role/r", "us-west-2");
        assert!(statement.sql.contains("FORMAT AS JSON 'auto'"));
    }
}
