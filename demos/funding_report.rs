use branch_balance_analytics::*;
use chrono::{Days, NaiveDate};

fn balance_row(date: NaiveDate, branch: &str, product: &str, nominal: i64) -> RawRow {
    RawRow::new()
        .with("Tanggal", date.format("%Y-%m-%d").to_string())
        .with("KodeCabang", branch)
        .with("KodeProduk", product)
        .with("Nominal", nominal)
}

fn lending_row(
    date: NaiveDate,
    branch: &str,
    collectibility: i64,
    outstanding: i64,
    group: &str,
) -> RawRow {
    RawRow::new()
        .with("Tanggal", date.format("%Y-%m-%d").to_string())
        .with("KodeCabang", branch)
        .with("KodeProduk", "MRB")
        .with("Kolektibilitas", collectibility)
        .with("JmlPencairan", outstanding)
        .with("ByrPokok", 0)
        .with("KodeGrup1", group)
        .with("KdKolektor", format!("K{}", branch))
}

fn main() -> anyhow::Result<()> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut source = InMemorySource::new();

    for day in 0..90u64 {
        let date = start + Days::new(day);
        let drift = day as i64 * 2_500_000;
        for (branch, base) in [("01", 4_000_000_000i64), ("02", 1_500_000_000)] {
            source.insert(
                RecordStream::Saving,
                balance_row(date, branch, "T1", base + drift),
            );
            source.insert(
                RecordStream::Deposito,
                balance_row(date, branch, "D1", base * 2 - drift),
            );
            source.insert(
                RecordStream::Financing,
                lending_row(date, branch, 1, base + drift * 3, "G1"),
            );
            source.insert(
                RecordStream::Financing,
                lending_row(date, branch, if day > 45 { 3 } else { 2 }, base / 10, "G2"),
            );
            source.insert(
                RecordStream::Rahn,
                RawRow::new()
                    .with("Tanggal", date.format("%Y-%m-%d").to_string())
                    .with("KodeCabang", branch)
                    .with("KodeProduk", "RHN")
                    .with("Kolektibilitas", 1)
                    .with("Nominal", base / 20),
            );
        }
    }

    let config = EngineConfig::default();
    let mappings = CodeMappings {
        branches: CodeMapping::branches([("01", "Kantor Pusat"), ("02", "Cabang Kota")], &config),
        products_a: CodeMapping::from_pairs(CodeDomain::Product, [("T1", "Tabungan Wadiah")]),
        products_b: CodeMapping::from_pairs(CodeDomain::Product, [("D1", "Deposito 1 Bulan")]),
        group1: CodeMapping::from_pairs(CodeDomain::Group, [("G1", "Usaha Mikro"), ("G2", "Konsumer")]),
        ..CodeMappings::default()
    };

    let range = DateRange::parse("2024-01:2024-03")?;
    let branches = BranchAccess::parse("all").available_branches(&mappings.branches);

    let funding = load_funding(&source, range, &config)?;
    let ctx = FilterContext::new(
        range,
        branches.clone(),
        ["T1", "D1"],
        PeriodBucket::Month,
        GrowthUnit::Percentage,
    );
    let report = analyze_funding(&funding, &mappings, &ctx)?;

    let headline = &report.portfolio.headline.total;
    println!(
        "{}: {} ({})",
        headline.label, headline.formatted_value, headline.formatted_delta
    );
    println!("{}: {}", report.casa.label, report.casa.formatted_value);
    for row in report.portfolio.pivot.formatted() {
        println!("{}", row.join(" | "));
    }

    let lending = load_lending(&source, range, &config)?;
    let lending_ctx = ctx.with_products(["MRB", "RHN"]);
    let lending_report = analyze_lending(&lending, &mappings, &lending_ctx)?;
    println!(
        "{}: {} ({})",
        lending_report.npf.label, lending_report.npf.formatted_value, lending_report.npf.formatted_delta
    );

    let comparison = BranchAnalytics::compare_funding(&funding, &mappings, &ctx, "01", "02")?;
    println!("{}", comparison.headers().join(" | "));
    for row in comparison.summary_table() {
        println!("{}", row.join(" | "));
    }

    println!("{}", serde_json::to_string_pretty(&report.portfolio.summary)?);
    Ok(())
}
