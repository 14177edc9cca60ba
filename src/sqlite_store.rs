use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::model::{
    BookmakerOdds, Fixture, FixtureEstimate, FixtureKey, FullTimeResult, League, Match,
    MatchStatistics, ProbabilityEstimate, Season, SeasonId, SeasonStanding, Side, StatBand,
    StatKey, StatSample, Team, TeamId,
};
use crate::orchestrator::BatchSummary;
use crate::reference::ReferenceTable;
use crate::store::DataStore;
use crate::tier::TierStatus;

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M:%S";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    reference: Option<ReferenceTable>,
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS leagues (
            league_id INTEGER PRIMARY KEY,
            code TEXT NOT NULL,
            name TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS teams (
            team_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            league_id INTEGER NULL
        );
        CREATE TABLE IF NOT EXISTS seasons (
            season_id INTEGER PRIMARY KEY,
            label TEXT NOT NULL UNIQUE
        );
        CREATE TABLE IF NOT EXISTS current_league (
            team_id INTEGER NOT NULL,
            season_id INTEGER NOT NULL,
            league_code TEXT NOT NULL,
            PRIMARY KEY (team_id, season_id)
        );
        CREATE TABLE IF NOT EXISTS standings (
            team_id INTEGER NOT NULL,
            season_id INTEGER NOT NULL,
            is_final INTEGER NOT NULL,
            played INTEGER NOT NULL,
            wins INTEGER NOT NULL,
            draws INTEGER NOT NULL,
            losses INTEGER NOT NULL,
            points INTEGER NOT NULL,
            PRIMARY KEY (team_id, season_id, is_final)
        );
        CREATE TABLE IF NOT EXISTS matches (
            match_id INTEGER PRIMARY KEY,
            date TEXT NOT NULL,
            league_id INTEGER NULL,
            season_id INTEGER NULL,
            home_team_id INTEGER NOT NULL,
            away_team_id INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_pair ON matches(home_team_id, away_team_id, date);
        CREATE TABLE IF NOT EXISTS match_statistics (
            match_id INTEGER PRIMARY KEY REFERENCES matches(match_id) ON DELETE CASCADE,
            ft_home_goals INTEGER NOT NULL,
            ft_away_goals INTEGER NOT NULL,
            ft_result TEXT NOT NULL,
            ht_home_goals INTEGER NOT NULL,
            ht_away_goals INTEGER NOT NULL,
            shots_home INTEGER NOT NULL,
            shots_away INTEGER NOT NULL,
            shots_on_target_home INTEGER NOT NULL,
            shots_on_target_away INTEGER NOT NULL,
            fouls_home INTEGER NOT NULL,
            fouls_away INTEGER NOT NULL,
            corners_home INTEGER NOT NULL,
            corners_away INTEGER NOT NULL,
            yellow_home INTEGER NOT NULL,
            yellow_away INTEGER NOT NULL,
            red_home INTEGER NOT NULL,
            red_away INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS new_odds (
            date TEXT NOT NULL,
            time TEXT NOT NULL,
            home_team_id INTEGER NOT NULL,
            away_team_id INTEGER NOT NULL,
            season_id INTEGER NOT NULL,
            league_id INTEGER NULL,
            league_code TEXT NULL,
            home_odds REAL NULL,
            draw_odds REAL NULL,
            away_odds REAL NULL,
            PRIMARY KEY (date, time, home_team_id, away_team_id)
        );
        CREATE TABLE IF NOT EXISTS odds_calculations (
            date TEXT NOT NULL,
            time TEXT NOT NULL,
            home_team_id INTEGER NOT NULL,
            away_team_id INTEGER NOT NULL,
            home_prob REAL NOT NULL,
            draw_prob REAL NOT NULL,
            away_prob REAL NOT NULL,
            home_status TEXT NOT NULL,
            away_status TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (date, time, home_team_id, away_team_id)
        );
        CREATE TABLE IF NOT EXISTS stat_bands (
            date TEXT NOT NULL,
            time TEXT NOT NULL,
            home_team_id INTEGER NOT NULL,
            away_team_id INTEGER NOT NULL,
            stat TEXT NOT NULL,
            side TEXT NOT NULL,
            samples_json TEXT NOT NULL,
            goal_correlation REAL NOT NULL,
            PRIMARY KEY (date, time, home_team_id, away_team_id, stat, side)
        );
        CREATE TABLE IF NOT EXISTS calculation_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            fixtures INTEGER NOT NULL,
            saved INTEGER NOT NULL,
            skipped INTEGER NOT NULL,
            failed INTEGER NOT NULL,
            save_failures INTEGER NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FMT).with_context(|| format!("bad date {raw:?}"))
}

fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, TIME_FMT).with_context(|| format!("bad time {raw:?}"))
}

fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

fn fmt_time(time: NaiveTime) -> String {
    time.format(TIME_FMT).to_string()
}

struct RawKey {
    date: String,
    time: String,
    home_team_id: TeamId,
    away_team_id: TeamId,
}

impl RawKey {
    fn parse(&self) -> Result<FixtureKey> {
        Ok(FixtureKey {
            date: parse_date(&self.date)?,
            time: parse_time(&self.time)?,
            home_team_id: self.home_team_id,
            away_team_id: self.away_team_id,
        })
    }
}

fn standing_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SeasonStanding> {
    Ok(SeasonStanding {
        team_id: row.get(0)?,
        season_id: row.get(1)?,
        played: row.get(2)?,
        wins: row.get(3)?,
        draws: row.get(4)?,
        losses: row.get(5)?,
        points: row.get(6)?,
    })
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open sqlite db {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            reference: None,
        })
    }

    pub fn with_reference(mut self, reference: ReferenceTable) -> Self {
        self.reference = Some(reference);
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("sqlite connection lock poisoned"))
    }

    /// Run raw SQL against the underlying connection.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock()?.execute_batch(sql).context("execute sql batch")
    }

    pub fn upsert_league(&self, league: &League) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO leagues (league_id, code, name) VALUES (?1, ?2, ?3)",
                params![league.id, league.code, league.name],
            )
            .context("upsert league")?;
        Ok(())
    }

    pub fn upsert_team(&self, team: &Team) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO teams (team_id, name, league_id) VALUES (?1, ?2, ?3)",
                params![team.id, team.name, team.league_id],
            )
            .context("upsert team")?;
        Ok(())
    }

    pub fn upsert_season(&self, season: &Season) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO seasons (season_id, label) VALUES (?1, ?2)",
                params![season.id, season.label],
            )
            .context("upsert season")?;
        Ok(())
    }

    pub fn upsert_team_league(
        &self,
        team_id: TeamId,
        season_id: SeasonId,
        league_code: &str,
    ) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO current_league (team_id, season_id, league_code)
                 VALUES (?1, ?2, ?3)",
                params![team_id, season_id, league_code],
            )
            .context("upsert team league")?;
        Ok(())
    }

    pub fn upsert_standing(&self, standing: &SeasonStanding, is_final: bool) -> Result<()> {
        self.lock()?
            .execute(
                r#"
                INSERT OR REPLACE INTO standings (
                    team_id, season_id, is_final, played, wins, draws, losses, points
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    standing.team_id,
                    standing.season_id,
                    is_final as i64,
                    standing.played,
                    standing.wins,
                    standing.draws,
                    standing.losses,
                    standing.points,
                ],
            )
            .context("upsert standing")?;
        Ok(())
    }

    pub fn upsert_match(&self, m: &Match) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().context("begin match transaction")?;
        tx.execute(
            r#"
            INSERT OR REPLACE INTO matches (
                match_id, date, league_id, season_id, home_team_id, away_team_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                m.id as i64,
                fmt_date(m.date),
                m.league_id,
                m.season_id,
                m.home_team_id,
                m.away_team_id,
            ],
        )
        .context("upsert match")?;
        if let Some(s) = &m.statistics {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO match_statistics (
                    match_id, ft_home_goals, ft_away_goals, ft_result,
                    ht_home_goals, ht_away_goals, shots_home, shots_away,
                    shots_on_target_home, shots_on_target_away, fouls_home, fouls_away,
                    corners_home, corners_away, yellow_home, yellow_away, red_home, red_away
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                    ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18
                )
                "#,
                params![
                    m.id as i64,
                    s.full_time_home_goals,
                    s.full_time_away_goals,
                    s.full_time_result.as_code(),
                    s.half_time_home_goals,
                    s.half_time_away_goals,
                    s.shots_home,
                    s.shots_away,
                    s.shots_on_target_home,
                    s.shots_on_target_away,
                    s.fouls_home,
                    s.fouls_away,
                    s.corners_home,
                    s.corners_away,
                    s.yellow_cards_home,
                    s.yellow_cards_away,
                    s.red_cards_home,
                    s.red_cards_away,
                ],
            )
            .context("upsert match statistics")?;
        }
        tx.commit().context("commit match transaction")?;
        Ok(())
    }

    /// An upcoming fixture, optionally with bookmaker prices.
    pub fn upsert_fixture(&self, fixture: &Fixture, odds: Option<&BookmakerOdds>) -> Result<()> {
        self.lock()?
            .execute(
                r#"
                INSERT INTO new_odds (
                    date, time, home_team_id, away_team_id, season_id, league_id,
                    league_code, home_odds, draw_odds, away_odds
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(date, time, home_team_id, away_team_id) DO UPDATE SET
                    season_id = excluded.season_id,
                    league_id = excluded.league_id,
                    league_code = excluded.league_code,
                    home_odds = excluded.home_odds,
                    draw_odds = excluded.draw_odds,
                    away_odds = excluded.away_odds
                "#,
                params![
                    fmt_date(fixture.date),
                    fmt_time(fixture.time),
                    fixture.home_team_id,
                    fixture.away_team_id,
                    fixture.season_id,
                    fixture.league_id,
                    fixture.league_code,
                    odds.map(|o| o.home),
                    odds.map(|o| o.draw),
                    odds.map(|o| o.away),
                ],
            )
            .context("upsert fixture")?;
        Ok(())
    }

    pub fn estimate_count(&self) -> Result<usize> {
        let n: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM odds_calculations", [], |row| row.get(0))
            .context("count estimates")?;
        Ok(n as usize)
    }

    pub fn run_count(&self) -> Result<usize> {
        let n: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM calculation_runs", [], |row| row.get(0))
            .context("count calculation runs")?;
        Ok(n as usize)
    }

    fn standing(
        &self,
        team_id: TeamId,
        season_id: SeasonId,
        is_final: bool,
    ) -> Result<Option<SeasonStanding>> {
        self.lock()?
            .query_row(
                r#"
                SELECT team_id, season_id, played, wins, draws, losses, points
                FROM standings
                WHERE team_id = ?1 AND season_id = ?2 AND is_final = ?3
                "#,
                params![team_id, season_id, is_final as i64],
                standing_row,
            )
            .optional()
            .context("query standing")
    }

    fn bands_for(conn: &Connection, key: &FixtureKey) -> Result<Vec<StatBand>> {
        let mut stmt = conn
            .prepare(
                r#"
                SELECT stat, side, samples_json, goal_correlation
                FROM stat_bands
                WHERE date = ?1 AND time = ?2 AND home_team_id = ?3 AND away_team_id = ?4
                ORDER BY stat ASC, side DESC
                "#,
            )
            .context("prepare stat band query")?;
        let rows = stmt
            .query_map(
                params![
                    fmt_date(key.date),
                    fmt_time(key.time),
                    key.home_team_id,
                    key.away_team_id
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, f64>(3)?,
                    ))
                },
            )
            .context("query stat bands")?;

        let mut out = Vec::new();
        for row in rows {
            let (stat, side, samples, goal_correlation) = row.context("decode stat band row")?;
            let samples: Vec<StatSample> =
                serde_json::from_str(&samples).context("decode stat band samples")?;
            out.push(StatBand {
                stat: StatKey::parse(&stat).ok_or_else(|| anyhow!("unknown stat {stat:?}"))?,
                side: Side::parse(&side).ok_or_else(|| anyhow!("unknown side {side:?}"))?,
                samples,
                goal_correlation,
            });
        }
        Ok(out)
    }
}

impl DataStore for SqliteStore {
    fn get_fixtures(&self, after: NaiveDateTime) -> Result<Vec<Fixture>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT date, time, home_team_id, away_team_id, season_id, league_id, league_code
                FROM new_odds
                WHERE date || ' ' || time > ?1
                ORDER BY date ASC, time ASC, home_team_id ASC, away_team_id ASC
                "#,
            )
            .context("prepare fixtures query")?;
        let cutoff = after.format("%Y-%m-%d %H:%M:%S").to_string();
        let rows = stmt
            .query_map(params![cutoff], |row| {
                Ok((
                    RawKey {
                        date: row.get(0)?,
                        time: row.get(1)?,
                        home_team_id: row.get(2)?,
                        away_team_id: row.get(3)?,
                    },
                    row.get::<_, SeasonId>(4)?,
                    row.get::<_, Option<u32>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            })
            .context("query fixtures")?;

        let mut out = Vec::new();
        for row in rows {
            let (raw, season_id, league_id, league_code) = row.context("decode fixture row")?;
            let key = raw.parse()?;
            out.push(Fixture {
                date: key.date,
                time: key.time,
                home_team_id: key.home_team_id,
                away_team_id: key.away_team_id,
                season_id,
                league_id,
                league_code,
            });
        }
        Ok(out)
    }

    fn get_season(&self, season_id: SeasonId) -> Result<Option<Season>> {
        self.lock()?
            .query_row(
                "SELECT season_id, label FROM seasons WHERE season_id = ?1",
                params![season_id],
                |row| {
                    Ok(Season {
                        id: row.get(0)?,
                        label: row.get(1)?,
                    })
                },
            )
            .optional()
            .context("query season")
    }

    fn find_season_by_label(&self, label: &str) -> Result<Option<Season>> {
        self.lock()?
            .query_row(
                "SELECT season_id, label FROM seasons WHERE label = ?1",
                params![label],
                |row| {
                    Ok(Season {
                        id: row.get(0)?,
                        label: row.get(1)?,
                    })
                },
            )
            .optional()
            .context("query season by label")
    }

    fn get_team(&self, team_id: TeamId) -> Result<Option<Team>> {
        self.lock()?
            .query_row(
                "SELECT team_id, name, league_id FROM teams WHERE team_id = ?1",
                params![team_id],
                |row| {
                    Ok(Team {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        league_id: row.get(2)?,
                    })
                },
            )
            .optional()
            .context("query team")
    }

    fn get_standing(
        &self,
        team_id: TeamId,
        season_id: SeasonId,
    ) -> Result<Option<SeasonStanding>> {
        self.standing(team_id, season_id, false)
    }

    fn get_final_standing(
        &self,
        team_id: TeamId,
        season_id: SeasonId,
    ) -> Result<Option<SeasonStanding>> {
        self.standing(team_id, season_id, true)
    }

    fn get_reference_standing(&self, team: &Team) -> Result<Option<SeasonStanding>> {
        Ok(self
            .reference
            .as_ref()
            .and_then(|r| r.standing_for(team.id, &team.name)))
    }

    fn get_team_league(&self, team_id: TeamId, season_id: SeasonId) -> Result<Option<String>> {
        self.lock()?
            .query_row(
                "SELECT league_code FROM current_league WHERE team_id = ?1 AND season_id = ?2",
                params![team_id, season_id],
                |row| row.get(0),
            )
            .optional()
            .context("query team league")
    }

    fn get_matches(&self, home: TeamId, away: TeamId, limit: Option<usize>) -> Result<Vec<Match>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT
                    m.match_id, m.date, m.league_id, m.season_id, m.home_team_id, m.away_team_id,
                    s.ft_home_goals, s.ft_away_goals, s.ft_result,
                    s.ht_home_goals, s.ht_away_goals, s.shots_home, s.shots_away,
                    s.shots_on_target_home, s.shots_on_target_away, s.fouls_home, s.fouls_away,
                    s.corners_home, s.corners_away, s.yellow_home, s.yellow_away,
                    s.red_home, s.red_away
                FROM matches m
                LEFT JOIN match_statistics s ON s.match_id = m.match_id
                WHERE m.home_team_id = ?1 AND m.away_team_id = ?2
                ORDER BY m.date DESC, m.match_id DESC
                LIMIT ?3
                "#,
            )
            .context("prepare matches query")?;
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map(|n| n as i64).unwrap_or(-1);
        let rows = stmt
            .query_map(params![home, away, limit], |row| {
                let result: Option<String> = row.get(8)?;
                let statistics = match result.as_deref().and_then(FullTimeResult::parse) {
                    Some(full_time_result) => Some(MatchStatistics {
                        full_time_home_goals: row.get(6)?,
                        full_time_away_goals: row.get(7)?,
                        full_time_result,
                        half_time_home_goals: row.get(9)?,
                        half_time_away_goals: row.get(10)?,
                        shots_home: row.get(11)?,
                        shots_away: row.get(12)?,
                        shots_on_target_home: row.get(13)?,
                        shots_on_target_away: row.get(14)?,
                        fouls_home: row.get(15)?,
                        fouls_away: row.get(16)?,
                        corners_home: row.get(17)?,
                        corners_away: row.get(18)?,
                        yellow_cards_home: row.get(19)?,
                        yellow_cards_away: row.get(20)?,
                        red_cards_home: row.get(21)?,
                        red_cards_away: row.get(22)?,
                    }),
                    None => None,
                };
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<u32>>(2)?,
                    row.get::<_, Option<u32>>(3)?,
                    row.get::<_, TeamId>(4)?,
                    row.get::<_, TeamId>(5)?,
                    statistics,
                ))
            })
            .context("query matches")?;

        let mut out = Vec::new();
        for row in rows {
            let (id, date, league_id, season_id, home_team_id, away_team_id, statistics) =
                row.context("decode match row")?;
            out.push(Match {
                id: id as u64,
                date: parse_date(&date)?,
                league_id,
                season_id,
                home_team_id,
                away_team_id,
                statistics,
            });
        }
        Ok(out)
    }

    fn save_estimate(&self, estimate: &FixtureEstimate) -> Result<()> {
        let key = &estimate.key;
        let date = fmt_date(key.date);
        let time = fmt_time(key.time);
        let mut conn = self.lock()?;
        let tx = conn.transaction().context("begin estimate transaction")?;
        tx.execute(
            r#"
            INSERT INTO odds_calculations (
                date, time, home_team_id, away_team_id,
                home_prob, draw_prob, away_prob, home_status, away_status, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(date, time, home_team_id, away_team_id) DO UPDATE SET
                home_prob = excluded.home_prob,
                draw_prob = excluded.draw_prob,
                away_prob = excluded.away_prob,
                home_status = excluded.home_status,
                away_status = excluded.away_status,
                updated_at = excluded.updated_at
            "#,
            params![
                date,
                time,
                key.home_team_id,
                key.away_team_id,
                estimate.estimate.home,
                estimate.estimate.draw,
                estimate.estimate.away,
                estimate.home_status.as_str(),
                estimate.away_status.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )
        .context("upsert estimate")?;
        tx.execute(
            r#"
            DELETE FROM stat_bands
            WHERE date = ?1 AND time = ?2 AND home_team_id = ?3 AND away_team_id = ?4
            "#,
            params![date, time, key.home_team_id, key.away_team_id],
        )
        .context("clear stat bands")?;
        for band in &estimate.bands {
            let samples = serde_json::to_string(&band.samples).context("encode band samples")?;
            tx.execute(
                r#"
                INSERT INTO stat_bands (
                    date, time, home_team_id, away_team_id, stat, side,
                    samples_json, goal_correlation
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    date,
                    time,
                    key.home_team_id,
                    key.away_team_id,
                    band.stat.as_str(),
                    band.side.as_str(),
                    samples,
                    band.goal_correlation,
                ],
            )
            .context("insert stat band")?;
        }
        tx.commit().context("commit estimate transaction")?;
        Ok(())
    }

    fn list_estimates(&self) -> Result<Vec<FixtureEstimate>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT date, time, home_team_id, away_team_id,
                       home_prob, draw_prob, away_prob, home_status, away_status
                FROM odds_calculations
                ORDER BY date ASC, time ASC, home_team_id ASC, away_team_id ASC
                "#,
            )
            .context("prepare estimates query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    RawKey {
                        date: row.get(0)?,
                        time: row.get(1)?,
                        home_team_id: row.get(2)?,
                        away_team_id: row.get(3)?,
                    },
                    ProbabilityEstimate {
                        home: row.get(4)?,
                        draw: row.get(5)?,
                        away: row.get(6)?,
                    },
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                ))
            })
            .context("query estimates")?;

        let mut out = Vec::new();
        for row in rows {
            let (raw, estimate, home_status, away_status) = row.context("decode estimate row")?;
            let key = raw.parse()?;
            out.push(FixtureEstimate {
                key,
                estimate,
                bands: Self::bands_for(&conn, &key)?,
                home_status: TierStatus::parse(&home_status),
                away_status: TierStatus::parse(&away_status),
            });
        }
        Ok(out)
    }

    fn get_bookmaker_odds(&self, key: &FixtureKey) -> Result<Option<BookmakerOdds>> {
        let prices: Option<(Option<f64>, Option<f64>, Option<f64>)> = self
            .lock()?
            .query_row(
                r#"
                SELECT home_odds, draw_odds, away_odds
                FROM new_odds
                WHERE date = ?1 AND time = ?2 AND home_team_id = ?3 AND away_team_id = ?4
                "#,
                params![
                    fmt_date(key.date),
                    fmt_time(key.time),
                    key.home_team_id,
                    key.away_team_id
                ],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .context("query bookmaker odds")?;
        Ok(match prices {
            Some((Some(home), Some(draw), Some(away))) => Some(BookmakerOdds {
                key: *key,
                home,
                draw,
                away,
            }),
            _ => None,
        })
    }

    fn record_run(&self, summary: &BatchSummary) -> Result<()> {
        self.lock()?
            .execute(
                r#"
                INSERT INTO calculation_runs (
                    started_at, finished_at, fixtures, saved, skipped, failed, save_failures
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    summary.started_at.to_rfc3339(),
                    summary.finished_at.to_rfc3339(),
                    summary.fixtures as i64,
                    summary.saved as i64,
                    summary.skipped as i64,
                    summary.failed as i64,
                    summary.save_failures as i64,
                ],
            )
            .context("record calculation run")?;
        Ok(())
    }
}
