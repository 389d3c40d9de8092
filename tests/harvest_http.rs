use std::sync::{Arc, Mutex};
use std::time::Duration;

use knapsack_scraper::{
    Category, FetchError, HarvestConfig, HarvestError, Harvester, HttpFetcher, PageFetcher,
    Progress, SearchRequest, SortKey,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
}

fn config(server: &MockServer, concurrency: usize) -> HarvestConfig {
    HarvestConfig {
        base_url: format!("{}/core", server.uri()),
        concurrency,
        jitter: None,
        time_unit: Duration::from_millis(1),
        ..Default::default()
    }
}

fn harvester(server: &MockServer, concurrency: usize) -> Harvester<HttpFetcher> {
    let cfg = config(server, concurrency);
    let fetcher = HttpFetcher::new(&cfg).unwrap();
    Harvester::new(fetcher, cfg).unwrap()
}

async fn mount_search(server: &MockServer, category: &str, word: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/core/result.php"))
        .and(query_param("sname", category))
        .and(query_param("word", word))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/core/information.php"))
        .and(query_param("word", id))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn organism_server() -> MockServer {
    let server = MockServer::start().await;
    mount_search(&server, "organism", "Bacillus", fixture("search_organism")).await;
    mount_detail(
        &server,
        "C00000001",
        ResponseTemplate::new(200).set_body_string(fixture("detail_bacillaene")),
    )
    .await;
    mount_detail(
        &server,
        "C00000002",
        ResponseTemplate::new(200).set_body_string(fixture("detail_surfactin")),
    )
    .await;
    mount_detail(
        &server,
        "C00000003",
        ResponseTemplate::new(200).set_body_string(fixture("detail_unknown_cas")),
    )
    .await;
    server
}

#[tokio::test]
async fn test_organism_search_end_to_end() {
    let server = organism_server().await;
    let h = harvester(&server, 10);

    let req = SearchRequest::new(Category::Organism, "Bacillus");
    let mut set = h.run(&req, None).await.unwrap();
    set.sort_by(SortKey::Id);

    assert_eq!(set.scheduled, 3);
    assert_eq!(set.failed, 0);
    assert_eq!(set.len(), 3);

    let first = &set.records[0];
    assert_eq!(first.names, ["Bacillaene", "Bacillaene A"]);
    assert_eq!(first.cas, "123-45-6");
    assert_eq!(first.database_id, "C00000001");
    assert_eq!(first.smiles, "CC(C)C=CC(=O)NCC=CC(O)C");
    assert_eq!(first.organism.as_deref(), Some("Bacillus subtilis"));

    assert_eq!(set.records[1].organism.as_deref(), Some("Bacillus amyloliquefaciens"));
    // CAS 95-00-0 is not on the search page
    assert_eq!(set.records[2].organism, None);
}

#[tokio::test]
async fn test_sequential_and_parallel_agree() {
    let server = organism_server().await;
    let req = SearchRequest::new(Category::Organism, "Bacillus");

    let mut seq = harvester(&server, 1).run(&req, None).await.unwrap();
    let mut par = harvester(&server, 10).run(&req, None).await.unwrap();
    seq.sort_by(SortKey::Id);
    par.sort_by(SortKey::Id);

    assert_eq!(seq.records, par.records);
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let server = MockServer::start().await;
    mount_search(&server, "metabolite", "surfactin", fixture("search_organism")).await;

    // two failures, then the real page
    Mock::given(method("GET"))
        .and(path("/core/information.php"))
        .and(query_param("word", "C00000002"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_detail(
        &server,
        "C00000002",
        ResponseTemplate::new(200).set_body_string(fixture("detail_surfactin")),
    )
    .await;
    mount_detail(
        &server,
        "C00000001",
        ResponseTemplate::new(200).set_body_string(fixture("detail_bacillaene")),
    )
    .await;
    // never recovers
    mount_detail(&server, "C00000003", ResponseTemplate::new(500)).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let progress: Arc<dyn Progress> = Arc::new(move |n: usize| sink.lock().unwrap().push(n));

    let req = SearchRequest::new(Category::Metabolite, "surfactin");
    let mut set = harvester(&server, 4).run(&req, Some(progress)).await.unwrap();
    set.sort_by(SortKey::Id);

    let ids: Vec<_> = set.records.iter().map(|r| r.database_id.as_str()).collect();
    assert_eq!(ids, ["C00000001", "C00000002"]);
    assert_eq!(set.failed, 1);
    assert!(set.records.iter().all(|r| r.organism.is_none()));
    assert_eq!(*seen.lock().unwrap(), [1, 2, 3]);

    let requests = server.received_requests().await.unwrap();
    let c3_hits = requests
        .iter()
        .filter(|r| r.url.query() == Some("word=C00000003"))
        .count();
    assert_eq!(c3_hits, 3);
}

#[tokio::test]
async fn test_header_only_page_is_no_results() {
    let server = MockServer::start().await;
    mount_search(&server, "metabolite", "zzzz", fixture("search_empty")).await;

    let req = SearchRequest::new(Category::Metabolite, "zzzz");
    let set = harvester(&server, 10).run(&req, None).await.unwrap();
    assert!(set.is_no_results());
    assert!(set.is_empty());
}

#[tokio::test]
async fn test_search_failure_aborts_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/core/result.php"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let req = SearchRequest::new(Category::Metabolite, "caffeine");
    let err = harvester(&server, 10).run(&req, None).await.unwrap_err();
    assert!(matches!(
        err,
        HarvestError::Search(FetchError::Status { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_http_fetcher_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&HarvestConfig::default()).unwrap();
    let url = format!("{}/missing", server.uri());
    match fetcher.fetch(&url).await {
        Err(FetchError::Status { status, url: failed }) => {
            assert_eq!(status, 404);
            assert_eq!(failed, url);
        }
        other => panic!("expected status error, got {:?}", other),
    }
}
