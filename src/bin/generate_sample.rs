//! Writes a synthetic CAGED movement table for Pernambuco.
//!
//! ```text
//! generate_sample [OUTPUT] [ROWS]
//! ```
//!
//! `OUTPUT` defaults to `caged_pe_sample.csv`. A `.parquet` extension writes
//! Parquet with typed columns; anything else writes `;`-delimited CSV with
//! Brazilian salary formatting, the layout of the official exports.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const DEFAULT_OUTPUT: &str = "caged_pe_sample.csv";
const DEFAULT_ROWS: usize = 5_000;

const CITIES: [(&str, f64); 5] = [
    ("Recife", 0.40),
    ("Jaboatão dos Guararapes", 0.20),
    ("Olinda", 0.15),
    ("Caruaru", 0.15),
    ("Petrolina", 0.10),
];
const YEARS: [i64; 4] = [2020, 2021, 2022, 2023];
const GENDERS: [&str; 2] = ["Homem", "Mulher"];
const RACES: [&str; 5] = ["Parda", "Branca", "Preta", "Amarela", "Não informada"];
const EDUCATION: [&str; 5] = [
    "Fundamental Completo",
    "Médio Incompleto",
    "Médio Completo",
    "Superior Incompleto",
    "Superior Completo",
];
const MOVEMENT_TYPES: [&str; 4] = [
    "Admissão por reemprego",
    "Admissão por primeiro emprego",
    "Desligamento por demissão sem justa causa",
    "Desligamento a pedido",
];
const EMPLOYER_TYPES: [&str; 2] = ["CNPJ RAIZ", "CPF"];
const ESTABLISHMENT_TYPES: [&str; 2] = ["CNPJ", "CAEPF"];
const CATEGORIES: [&str; 3] = ["Empregado - Geral", "Aprendiz", "Contrato por prazo determinado"];
const DISABILITIES: [&str; 3] = ["Não Deficiente", "Física", "Auditiva"];
const OCCUPATIONS: [&str; 5] = [
    "Vendedor de comércio varejista",
    "Auxiliar de escritório",
    "Servente de obras",
    "Operador de caixa",
    "Técnico de enfermagem",
];

/// Section name with its base salary.
const SECTIONS: [(&str, f64); 6] = [
    ("Comércio", 1_500.0),
    ("Serviços", 1_800.0),
    ("Indústria", 2_100.0),
    ("Construção", 1_900.0),
    ("Agropecuária", 1_400.0),
    ("Saúde Humana e Serviços Sociais", 2_600.0),
];

const HEADERS: [&str; 22] = [
    "uf",
    "município",
    "idade",
    "raçacor",
    "cbo2002ocupação",
    "categoria",
    "graudeinstrução",
    "sexo",
    "tipoempregador",
    "tipoestabelecimento",
    "tipomovimentação",
    "tipodedeficiência",
    "indtrabintermitente",
    "indtrabparcial",
    "salário",
    "seção",
    "valorsaláriofixo",
    "ano_declarado",
    "mes_declarado",
    "ano_exclusao",
    "mes_exclusao",
    "saldomovimentação",
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick from `(value, weight)` pairs whose weights sum to one.
    fn weighted<'a>(&mut self, items: &'a [(&'a str, f64)]) -> &'a str {
        let mut roll = self.next_f64();
        for (value, weight) in items {
            if roll < *weight {
                return *value;
            }
            roll -= *weight;
        }
        items[items.len() - 1].0
    }
}

struct Movement {
    city: &'static str,
    age: Option<i64>,
    race: &'static str,
    occupation: &'static str,
    category: &'static str,
    education: &'static str,
    gender: &'static str,
    employer_type: &'static str,
    establishment_type: &'static str,
    movement_type: &'static str,
    disability: &'static str,
    intermittent: bool,
    partial: bool,
    salary: Option<f64>,
    section: &'static str,
    fixed_salary: Option<f64>,
    year: i64,
    month: i64,
    exclusion: Option<(i64, i64)>,
    balance: i64,
}

fn generate(rng: &mut SimpleRng, rows: usize) -> Vec<Movement> {
    (0..rows)
        .map(|_| {
            let (section, base_salary) = *rng.pick(&SECTIONS);
            let gender = *rng.pick(&GENDERS);
            let age = rng.gauss(36.0, 11.0).round().clamp(16.0, 75.0) as i64;

            // Younger workers are let go more often.
            let termination_odds = if age < 25 { 0.55 } else { 0.45 };
            let balance = if rng.chance(termination_odds) { -1 } else { 1 };
            let movement_type = if balance > 0 {
                MOVEMENT_TYPES[(rng.next_u64() % 2) as usize]
            } else {
                MOVEMENT_TYPES[2 + (rng.next_u64() % 2) as usize]
            };

            let experience = 1.0 + (age - 16) as f64 * 0.012;
            let salary = (base_salary * experience + rng.gauss(0.0, 350.0)).max(600.0);
            let salary = (salary * 100.0).round() / 100.0;

            let year = *rng.pick(&YEARS);
            let month = 1 + (rng.next_u64() % 12) as i64;

            Movement {
                city: rng.weighted(&CITIES),
                age: (!rng.chance(0.02)).then_some(age),
                race: *rng.pick(&RACES),
                occupation: *rng.pick(&OCCUPATIONS),
                category: *rng.pick(&CATEGORIES),
                education: *rng.pick(&EDUCATION),
                gender,
                employer_type: *rng.pick(&EMPLOYER_TYPES),
                establishment_type: *rng.pick(&ESTABLISHMENT_TYPES),
                movement_type,
                disability: *rng.pick(&DISABILITIES),
                intermittent: rng.chance(0.05),
                partial: rng.chance(0.08),
                salary: (!rng.chance(0.03)).then_some(salary),
                section,
                fixed_salary: rng.chance(0.6).then_some(salary),
                year,
                month,
                exclusion: rng.chance(0.01).then(|| (year, month)),
                balance,
            }
        })
        .collect()
}

/// `1234.5` → `"1.234,50"`.
fn brazilian_decimal(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let digits = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("{grouped},{:02}", cents % 100)
}

fn flag(value: bool) -> &'static str {
    if value {
        "Sim"
    } else {
        "Não"
    }
}

fn write_csv(path: &Path, movements: &[Movement]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(HEADERS)?;

    for m in movements {
        let opt = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_default();
        writer.write_record([
            "PE".to_string(),
            m.city.to_string(),
            opt(m.age),
            m.race.to_string(),
            m.occupation.to_string(),
            m.category.to_string(),
            m.education.to_string(),
            m.gender.to_string(),
            m.employer_type.to_string(),
            m.establishment_type.to_string(),
            m.movement_type.to_string(),
            m.disability.to_string(),
            flag(m.intermittent).to_string(),
            flag(m.partial).to_string(),
            m.salary.map(brazilian_decimal).unwrap_or_default(),
            m.section.to_string(),
            m.fixed_salary.map(brazilian_decimal).unwrap_or_default(),
            m.year.to_string(),
            m.month.to_string(),
            opt(m.exclusion.map(|(y, _)| y)),
            opt(m.exclusion.map(|(_, mo)| mo)),
            m.balance.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, movements: &[Movement]) -> Result<()> {
    let text = |f: fn(&Movement) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(movements.iter().map(f).collect::<Vec<_>>()))
    };
    let int = |f: fn(&Movement) -> Option<i64>| -> ArrayRef {
        Arc::new(Int64Array::from(movements.iter().map(f).collect::<Vec<_>>()))
    };
    let float = |f: fn(&Movement) -> Option<f64>| -> ArrayRef {
        Arc::new(Float64Array::from(movements.iter().map(f).collect::<Vec<_>>()))
    };

    let columns: Vec<ArrayRef> = vec![
        text(|_| "PE"),
        text(|m| m.city),
        int(|m| m.age),
        text(|m| m.race),
        text(|m| m.occupation),
        text(|m| m.category),
        text(|m| m.education),
        text(|m| m.gender),
        text(|m| m.employer_type),
        text(|m| m.establishment_type),
        text(|m| m.movement_type),
        text(|m| m.disability),
        text(|m| flag(m.intermittent)),
        text(|m| flag(m.partial)),
        float(|m| m.salary),
        text(|m| m.section),
        float(|m| m.fixed_salary),
        int(|m| Some(m.year)),
        int(|m| Some(m.month)),
        int(|m| m.exclusion.map(|(y, _)| y)),
        int(|m| m.exclusion.map(|(_, mo)| mo)),
        int(|m| Some(m.balance)),
    ];

    let fields: Vec<Field> = HEADERS
        .iter()
        .zip(&columns)
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let output = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_string()));
    let rows = match args.next() {
        Some(n) => n.parse().with_context(|| format!("invalid row count '{n}'"))?,
        None => DEFAULT_ROWS,
    };

    let mut rng = SimpleRng::new(42);
    let movements = generate(&mut rng, rows);

    let is_parquet = output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));
    if is_parquet {
        write_parquet(&output, &movements)?;
    } else {
        write_csv(&output, &movements)?;
    }

    println!("Wrote {} movements to {}", movements.len(), output.display());
    Ok(())
}
