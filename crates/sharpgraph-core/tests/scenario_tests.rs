use std::path::{Path, PathBuf};

use sharpgraph_core::model::{EdgeKind, ElementKind, PropertyValue};
use sharpgraph_core::{Config, GraphStore, InMemoryStore, Pipeline, RunSummary};

fn write_sources(dir: &Path, sources: &[(&str, &str)]) -> PathBuf {
    let src = dir.join("src");
    for (name, text) in sources {
        let path = src.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }
    src
}

async fn run(
    config: Config,
    sources: &[(&str, &str)],
) -> (tempfile::TempDir, Pipeline<InMemoryStore>, RunSummary) {
    let dir = tempfile::tempdir().unwrap();
    let src = write_sources(dir.path(), sources);
    let pipeline = Pipeline::new(config, InMemoryStore::new());
    let summary = pipeline.run(&dir.path().join("out"), &[src]).await.unwrap();
    (dir, pipeline, summary)
}

fn pairs(edges: &[(&str, &str)]) -> Vec<(String, String)> {
    edges
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

#[tokio::test]
async fn test_override_and_inheritance() {
    let (_dir, pipeline, _) = run(
        Config::default(),
        &[(
            "Shapes.cs",
            r#"
class A
{
    public virtual void Foo() { }
}

class B : A
{
    public override void Foo() { }
}
"#,
        )],
    )
    .await;
    let store = pipeline.store();

    assert_eq!(store.find_node("A").await.unwrap(), Some(ElementKind::Class));
    assert_eq!(store.find_node("B").await.unwrap(), Some(ElementKind::Class));
    assert_eq!(store.find_node("A.Foo()").await.unwrap(), Some(ElementKind::Method));
    assert_eq!(store.find_node("B.Foo()").await.unwrap(), Some(ElementKind::Method));

    assert_eq!(store.edges(EdgeKind::Inherits).await.unwrap(), pairs(&[("B", "A")]));
    assert_eq!(
        store.edges(EdgeKind::HasMethod).await.unwrap(),
        pairs(&[("A", "A.Foo()"), ("B", "B.Foo()")])
    );
    assert_eq!(
        store.edges(EdgeKind::Overrides).await.unwrap(),
        pairs(&[("B.Foo()", "A.Foo()")])
    );
}

#[tokio::test]
async fn test_explicit_interface_implementation_kept_apart() {
    let (_dir, pipeline, summary) = run(
        Config::default(),
        &[(
            "C.cs",
            r#"
interface I1 { void Foo(); }
interface I2 { void Foo(); }

class C : I1, I2
{
    public void Foo() { }
    void I2.Foo() { Bar(); }
    void Bar() { }
}
"#,
        )],
    )
    .await;
    let store = pipeline.store();

    assert_eq!(store.find_node("C.Foo()").await.unwrap(), Some(ElementKind::Method));
    assert_eq!(store.find_node("C.I2.Foo()").await.unwrap(), Some(ElementKind::Method));
    assert_eq!(summary.fragments_merged, 0);

    let invokes = store.edges(EdgeKind::Invokes).await.unwrap();
    assert_eq!(invokes, pairs(&[("C.I2.Foo()", "C.Bar()")]));

    let implements = store.edges(EdgeKind::Implements).await.unwrap();
    assert!(implements.contains(&("C.Foo()".to_string(), "I1.Foo()".to_string())));
    assert!(implements.contains(&("C.I2.Foo()".to_string(), "I2.Foo()".to_string())));
}

#[tokio::test]
async fn test_external_type_reported_once_and_snapshot_kept() {
    let (dir, pipeline, summary) = run(
        Config::default(),
        &[(
            "Shop.cs",
            r#"
class Shop
{
    void Bar()
    {
        Widget w = new Widget();
        w.Spin();
        w.Spin();
    }
}
"#,
        )],
    )
    .await;

    let report = std::fs::read_to_string(dir.path().join("out").join("outsideDep.txt")).unwrap();
    assert_eq!(report, "Widget\n");
    assert_eq!(summary.unresolved, 1);

    let bar = pipeline.store().node("Shop.Bar()").await.unwrap().unwrap();
    let variables = bar.properties["VariableContext"].as_str().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(variables).unwrap();
    assert_eq!(parsed[0]["Name"], "w");
    assert_eq!(parsed[0]["Type"], "Widget");
    assert_eq!(parsed[0]["IsLocal"], true);
    assert_eq!(bar.properties["InvokedContext"], PropertyValue::from("[]"));
}

#[tokio::test]
async fn test_multi_declarator_field_keeps_first_only() {
    let source = [("Point.cs", "class P { int x, y; }")];

    let (_dir, pipeline, _) = run(Config::default(), &source).await;
    let store = pipeline.store();
    assert_eq!(store.find_node("P.x").await.unwrap(), Some(ElementKind::Field));
    assert_eq!(store.find_node("P.y").await.unwrap(), None);

    let mut config = Config::default();
    config.analysis.expand_declarators = true;
    let (_dir, pipeline, _) = run(config, &source).await;
    let store = pipeline.store();
    assert_eq!(store.find_node("P.y").await.unwrap(), Some(ElementKind::Field));
    assert_eq!(
        store.edges(EdgeKind::HasField).await.unwrap(),
        pairs(&[("P", "P.x"), ("P", "P.y")])
    );
}

#[tokio::test]
async fn test_unresolved_calls_and_types_sorted() {
    let (dir, _pipeline, _) = run(
        Config::default(),
        &[(
            "Worker.cs",
            r#"
namespace Jobs
{
    class Worker
    {
        private Logger log;
        private Queue queue;

        public void Work(Job job)
        {
            log.Write(job);
            queue.Push(job);
            Done();
        }

        void Done() { }
    }
}
"#,
        )],
    )
    .await;

    let report = std::fs::read_to_string(dir.path().join("out").join("outsideDep.txt")).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    let mut sorted = lines.clone();
    sorted.sort();
    assert_eq!(lines, sorted);
    assert!(lines.contains(&"Job"));
    assert!(lines.contains(&"Logger"));
    assert!(lines.contains(&"Queue"));
    assert!(!lines.contains(&"Jobs.Worker.Done()"));
}

#[tokio::test]
async fn test_partial_class_across_files() {
    let (_dir, pipeline, summary) = run(
        Config::default(),
        &[
            ("A1.cs", "namespace N { public partial class A { void One() { } } }"),
            (
                "A2.cs",
                "namespace N { interface I { } public partial class A : I { void Two() { } } }",
            ),
        ],
    )
    .await;
    assert_eq!(summary.fragments_merged, 1);

    let a = pipeline.store().node("N.A").await.unwrap().unwrap();
    let locations = a.properties["FileLocation"].as_list().unwrap();
    assert_eq!(locations.len(), 2);
    assert!(locations[0].ends_with("A1.cs"));
    assert!(locations[1].ends_with("A2.cs"));
    assert_eq!(
        a.properties["RawDeclaration"],
        PropertyValue::from("public partial class A: I")
    );
    assert_eq!(
        pipeline.store().edges(EdgeKind::Implements).await.unwrap(),
        pairs(&[("N.A", "N.I")])
    );
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_sources(
        dir.path(),
        &[(
            "Calc.cs",
            "class Calc { int total; public void Add(int n) { total = total + n; Log(); } void Log() { } }",
        )],
    );
    let mut config = Config::default();
    config.store.purge_on_start = false;
    let pipeline = Pipeline::new(config, InMemoryStore::new());
    let out = dir.path().join("out");

    let first = pipeline.run(&out, &[src.clone()]).await.unwrap();
    let second = pipeline.run(&out, &[src]).await.unwrap();
    assert_eq!(first.store, second.store);
    assert_eq!(second.store.nodes, 4);
    assert_eq!(
        pipeline.store().edges(EdgeKind::Invokes).await.unwrap(),
        pairs(&[("Calc.Add(int)", "Calc.Log()")])
    );
    assert_eq!(
        pipeline.store().edges(EdgeKind::Access).await.unwrap(),
        pairs(&[("Calc.Add(int)", "Calc.total")])
    );
}
