use duckdb::{params, Connection};
use serde_json::json;
use tracing::info;

pub const SAMPLE_TABLES: [&str; 3] = ["population", "literacy", "housing"];

const STATES: [&str; 4] = ["Maharashtra", "Maharashtra", "Tamil Nadu", "Tamil Nadu"];
const DISTRICTS: [&str; 4] = ["Mumbai", "Pune", "Chennai", "Coimbatore"];
const YEAR: i32 = 2011;

/// Appends the sample census rows, creating the tables on first use.
/// All three tables are written in one transaction. Returns the row count of
/// each table afterwards.
pub fn seed_sample_data(conn: &mut Connection) -> Result<Vec<(String, i64)>, duckdb::Error> {
    let tx = conn.transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS population (
             state VARCHAR, district VARCHAR, year INTEGER,
             male BIGINT, female BIGINT, total BIGINT
         );
         CREATE TABLE IF NOT EXISTS literacy (
             state VARCHAR, district VARCHAR, year INTEGER,
             literate BIGINT, illiterate BIGINT
         );
         CREATE TABLE IF NOT EXISTS housing (
             state VARCHAR, district VARCHAR, year INTEGER,
             households BIGINT, amenities VARCHAR
         );",
    )?;

    let male: [i64; 4] = [9_800_000, 4_700_000, 4_300_000, 2_100_000];
    let female: [i64; 4] = [8_600_000, 4_500_000, 4_100_000, 2_000_000];
    let literate: [i64; 4] = [16_200_000, 8_000_000, 7_500_000, 3_500_000];
    let illiterate: [i64; 4] = [2_200_000, 1_200_000, 900_000, 600_000];
    let households: [i64; 4] = [4_500_000, 2_300_000, 2_100_000, 1_000_000];
    let amenities = [
        json!({"electricity": true, "water": true, "internet": true}),
        json!({"electricity": true, "water": true, "internet": false}),
        json!({"electricity": true, "water": true, "internet": true}),
        json!({"electricity": true, "water": false, "internet": false}),
    ];

    {
        let mut population = tx.prepare(
            "INSERT INTO population (state, district, year, male, female, total) VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        let mut literacy = tx.prepare(
            "INSERT INTO literacy (state, district, year, literate, illiterate) VALUES (?, ?, ?, ?, ?)",
        )?;
        let mut housing = tx.prepare(
            "INSERT INTO housing (state, district, year, households, amenities) VALUES (?, ?, ?, ?, ?)",
        )?;

        for i in 0..DISTRICTS.len() {
            population.execute(params![
                STATES[i],
                DISTRICTS[i],
                YEAR,
                male[i],
                female[i],
                male[i] + female[i]
            ])?;
            literacy.execute(params![
                STATES[i],
                DISTRICTS[i],
                YEAR,
                literate[i],
                illiterate[i]
            ])?;
            housing.execute(params![
                STATES[i],
                DISTRICTS[i],
                YEAR,
                households[i],
                amenities[i].to_string()
            ])?;
        }
    }

    tx.commit()?;
    info!("Data appended to tables: {}", SAMPLE_TABLES.join(", "));

    let mut counts = Vec::with_capacity(SAMPLE_TABLES.len());
    for table in SAMPLE_TABLES {
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        info!("Table '{}' now contains {} rows", table, count);
        counts.push((table.to_string(), count));
    }

    Ok(counts)
}
