use bzip2::write::BzEncoder;
use bzip2::Compression;
use chrono::{TimeZone, Utc};
use page_stats::report::write_report_file;
use page_stats::{
    CountingStrategy, Page, PageSource, PipelineBuilder, PipelineError, Result as StatsResult,
    StatsConfig, WordCounter,
};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn page_xml(title: &str, timestamp: &str, bytes: u64, body: &str) -> String {
    format!(
        "  <page>\n    <title>{}</title>\n    <revision>\n      <timestamp>{}</timestamp>\n      \
         <text bytes=\"{}\" xml:space=\"preserve\">{}</text>\n    </revision>\n  </page>\n",
        title, timestamp, bytes, body
    )
}

fn dump(pages: &[String]) -> String {
    let mut xml = String::from("<mediawiki>\n  <siteinfo><sitename>Тест</sitename></siteinfo>\n");
    for page in pages {
        xml.push_str(page);
    }
    xml.push_str("</mediawiki>\n");
    xml
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write input");
    path
}

fn write_bz2(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    let file = fs::File::create(&path).expect("create input");
    let mut encoder = BzEncoder::new(file, Compression::best());
    encoder.write_all(contents.as_bytes()).expect("compress");
    encoder.finish().expect("finish");
    path
}

fn stats_config() -> StatsConfig {
    StatsConfig::default().with_years(2000, 2024)
}

/// Five documents: three mention "дерево" twice each, one is 950 bytes from
/// 2005 and one is 15 000 bytes from 2019
fn scenario_dump() -> String {
    dump(&[
        page_xml("Лес", "2010-01-01T00:00:00Z", 7, "дерево растёт, дерево шумит"),
        page_xml("Сад", "2010-02-01T00:00:00Z", 42, "Дерево и ещё ДЕРЕВО"),
        page_xml("Парк", "2010-03-01T00:00:00Z", 1_000_000, "дерево, дерево"),
        page_xml("Река", "2005-05-05T12:00:00Z", 950, "вода течёт"),
        page_xml("Гора", "2019-09-09T09:09:09Z", 15_000, "камень лежит"),
    ])
}

fn corpus(dir: &TempDir) -> Vec<PathBuf> {
    let words = ["кошка", "собака", "дом", "лес", "река", "гора", "поле", "море"];
    (0..4)
        .map(|file| {
            let pages: Vec<String> = (0..40)
                .map(|i| {
                    let n = file * 40 + i;
                    let body = (0..(n % 7 + 3))
                        .map(|j| words[(n + j * j) % words.len()])
                        .collect::<Vec<_>>()
                        .join(" ");
                    page_xml(
                        &format!("Статья {}", words[n % words.len()]),
                        &format!("{}-06-15T10:00:00Z", 2001 + n % 20),
                        (n as u64 + 1) * 37,
                        &body,
                    )
                })
                .collect();
            write_bz2(dir, &format!("part{}.xml.bz2", file), &dump(&pages))
        })
        .collect()
}

#[test]
fn test_end_to_end_scenario() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "dump.xml", &scenario_dump());

    let stats = PipelineBuilder::new()
        .threads(2)
        .stats(stats_config())
        .build()
        .expect("Pipeline build failed")
        .run(vec![input])
        .expect("Pipeline run failed");

    assert_eq!(stats.pages(), 5);
    assert_eq!(stats.bodies().top_k(1), vec![("дерево".to_string(), 6)]);

    assert_eq!(stats.sizes().count(2), 1);
    assert_eq!(stats.sizes().count(4), 1);
    assert_eq!(stats.sizes().count(3), 0);
    assert_eq!(stats.sizes().total(), 5);

    assert_eq!(stats.years().count(2005), 1);
    assert_eq!(stats.years().count(2019), 1);
    assert_eq!(stats.years().count(2010), 3);
    assert_eq!(stats.years().total(), 5);
}

#[test]
fn test_compressed_input() {
    let dir = TempDir::new().unwrap();
    let input = write_bz2(&dir, "dump.xml.bz2", &scenario_dump());

    let stats = PipelineBuilder::new()
        .threads(1)
        .stats(stats_config())
        .build()
        .unwrap()
        .run(vec![input])
        .unwrap();

    assert_eq!(stats.pages(), 5);
    assert_eq!(stats.bodies().count("дерево"), 6);
}

#[test]
fn test_thread_count_does_not_change_results() {
    let dir = TempDir::new().unwrap();
    let inputs = corpus(&dir);

    let results: Vec<_> = [1, 2, 8]
        .iter()
        .map(|&threads| {
            PipelineBuilder::new()
                .threads(threads)
                .queue_capacity(8)
                .stats(stats_config())
                .build()
                .unwrap()
                .run(inputs.clone())
                .unwrap()
        })
        .collect();

    let first = &results[0];
    assert_eq!(first.pages(), 160);
    for other in &results[1..] {
        assert_eq!(other.pages(), first.pages());
        assert_eq!(other.titles().counts(), first.titles().counts());
        assert_eq!(other.bodies().counts(), first.bodies().counts());
        assert_eq!(other.sizes(), first.sizes());
        assert_eq!(other.years(), first.years());
        assert_eq!(other.bodies().top_k(5), first.bodies().top_k(5));
    }
}

#[test]
fn test_bounded_mode_underestimates_only() {
    let dir = TempDir::new().unwrap();
    let inputs = corpus(&dir);

    let exact = PipelineBuilder::new()
        .threads(4)
        .stats(stats_config())
        .build()
        .unwrap()
        .run(inputs.clone())
        .unwrap();
    let bounded = PipelineBuilder::new()
        .threads(4)
        .stats(
            stats_config()
                .with_strategy(CountingStrategy::Bounded)
                .with_reduction(50, 4),
        )
        .build()
        .unwrap()
        .run(inputs)
        .unwrap();

    assert_eq!(bounded.pages(), exact.pages());
    assert_eq!(bounded.sizes(), exact.sizes());
    assert_eq!(bounded.titles().counts(), exact.titles().counts());
    for (token, &count) in bounded.bodies().counts() {
        assert!(count <= exact.bodies().count(token), "{} overcounted", token);
    }
}

#[test]
fn test_out_of_range_years_are_skipped() {
    let dir = TempDir::new().unwrap();
    let input = write_file(
        &dir,
        "old.xml",
        &dump(&[
            page_xml("Старая", "1999-12-31T23:59:59Z", 10, "старое"),
            page_xml("Новая", "2001-01-01T00:00:00Z", 10, "новое"),
        ]),
    );

    let pipeline = PipelineBuilder::new()
        .threads(1)
        .stats(stats_config())
        .build()
        .unwrap();
    let running = pipeline.start(vec![input]).unwrap();
    let metrics = running.metrics().clone();
    let stats = running.wait().unwrap();

    assert_eq!(stats.pages(), 1);
    assert_eq!(stats.years().total(), 1);
    assert_eq!(stats.bodies().count("старое"), 0);
    assert_eq!(metrics.pages_rejected(), 1);
    assert_eq!(metrics.pages_produced(), 2);
}

#[test]
fn test_missing_input_fails_before_start() {
    let dir = TempDir::new().unwrap();
    let good = write_file(&dir, "good.xml", &scenario_dump());
    let missing = dir.path().join("missing.xml.bz2");

    let result = PipelineBuilder::new()
        .stats(stats_config())
        .build()
        .unwrap()
        .run(vec![good, missing]);
    assert!(matches!(result, Err(PipelineError::Input { .. })));
}

struct PanickingSource;

impl PageSource for PanickingSource {
    fn read_pages(
        &self,
        _input: &mut dyn BufRead,
        _on_page: &mut dyn FnMut(Page) -> StatsResult<()>,
    ) -> StatsResult<()> {
        panic!("decoder exploded");
    }
}

#[test]
fn test_worker_panic_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "dump.xml", &scenario_dump());

    let result = PipelineBuilder::new()
        .threads(2)
        .source(Arc::new(PanickingSource))
        .stats(stats_config())
        .build()
        .unwrap()
        .run(vec![input]);
    match result {
        Err(PipelineError::Thread(message)) => assert!(message.contains("decoder exploded")),
        other => panic!("expected thread error, got {:?}", other.map(|s| s.pages())),
    }
}

/// Emits a fixed number of pages per file, ignoring the file contents
struct SyntheticSource {
    pages: usize,
}

impl PageSource for SyntheticSource {
    fn read_pages(
        &self,
        _input: &mut dyn BufRead,
        on_page: &mut dyn FnMut(Page) -> StatsResult<()>,
    ) -> StatsResult<()> {
        let ts = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
        for i in 0..self.pages {
            on_page(Page::new("Синтетика", ts, "слово", i as u64))?;
        }
        Ok(())
    }
}

#[test]
fn test_small_queue_loses_nothing() {
    let dir = TempDir::new().unwrap();
    let inputs: Vec<PathBuf> = (0..6)
        .map(|i| write_file(&dir, &format!("f{}.xml", i), ""))
        .collect();

    let stats = PipelineBuilder::new()
        .producers(3)
        .aggregators(5)
        .queue_capacity(1)
        .source(Arc::new(SyntheticSource { pages: 500 }))
        .stats(stats_config())
        .build()
        .unwrap()
        .run(inputs)
        .unwrap();

    assert_eq!(stats.pages(), 3000);
    assert_eq!(stats.bodies().count("слово"), 3000);
    assert_eq!(stats.titles().count("синтетика"), 3000);
}

#[test]
fn test_report_file() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "dump.xml", &scenario_dump());
    let output = dir.path().join("statistics.txt");

    let stats = PipelineBuilder::new()
        .threads(2)
        .stats(stats_config())
        .build()
        .unwrap()
        .run(vec![input])
        .unwrap();
    write_report_file(&stats, 300, &output).unwrap();

    let report = fs::read_to_string(Path::new(&output)).unwrap();
    let sections: Vec<&str> = report.split("\n\n").collect();
    assert_eq!(sections.len(), 4);
    assert!(sections[1].lines().any(|line| line == "6 дерево"));
    assert_eq!(
        sections[2].lines().collect::<Vec<_>>(),
        vec![
            "Page size distribution (decimal digits - 1):",
            "0 1",
            "1 1",
            "2 1",
            "3 0",
            "4 1",
            "5 0",
            "6 1"
        ]
    );
    assert!(sections[3].starts_with("Pages by year:\n2005 1\n"));
    assert!(sections[3].trim_end().ends_with("2019 1"));
}
