use sharpgraph_core::extract::{traverse, ClassifyContext};
use sharpgraph_core::model::{EdgeKind, ElementKind, Endpoint, PropertyMap};
use sharpgraph_core::{
    persist, CodeElement, Compilation, EdgeOutcome, GraphBuffer, GraphStore, InMemoryStore,
    SurrealStore, UnresolvedRegistry, Validator,
};

const SOURCE: &str = r#"
namespace Zoo
{
    public interface IFeed { void Feed(); }
    public interface IClean { void Feed(); }

    public abstract class Animal
    {
        public abstract string Sound();
        public virtual void Sleep() { }
    }

    public class Lion : Animal, IFeed, IClean
    {
        public override string Sound() { return "roar"; }
        public void Feed() { Sleep(); }
    }
}
"#;

fn extract(sources: &[(&str, &str)]) -> Vec<CodeElement> {
    let compilation = Compilation::from_sources(sources).unwrap();
    let ctx = ClassifyContext {
        facts: &compilation,
        expand_declarators: false,
    };
    let mut buffer = GraphBuffer::new();
    for tree in compilation.trees() {
        traverse(tree.root(), &ctx, &mut buffer);
    }
    buffer.merge_fragments();
    buffer.elements().to_vec()
}

async fn surreal() -> SurrealStore {
    let store = SurrealStore::open_in_memory("test", "zoo").await.unwrap();
    store.initialize().await.unwrap();
    store
}

async fn sorted_edges(store: &dyn GraphStore, kind: EdgeKind) -> Vec<(String, String)> {
    let mut edges = store.edges(kind).await.unwrap();
    edges.sort();
    edges
}

async fn check_zoo_graph(store: &dyn GraphStore) {
    let elements = extract(&[("Zoo.cs", SOURCE)]);
    let stats = persist(store, &elements).await;
    assert_eq!(stats.node_failures, 0);
    assert_eq!(stats.edge_failures, 0);
    assert_eq!(stats.edges_dangling, 0);

    assert_eq!(
        sorted_edges(store, EdgeKind::HasAbstractMethod).await,
        vec![
            ("Zoo.Animal".to_string(), "Zoo.Animal.Sound()".to_string()),
            ("Zoo.IClean".to_string(), "Zoo.IClean.Feed()".to_string()),
            ("Zoo.IFeed".to_string(), "Zoo.IFeed.Feed()".to_string()),
        ]
    );
    assert_eq!(
        sorted_edges(store, EdgeKind::HasMethod).await,
        vec![
            ("Zoo.Animal".to_string(), "Zoo.Animal.Sleep()".to_string()),
            ("Zoo.Lion".to_string(), "Zoo.Lion.Feed()".to_string()),
            ("Zoo.Lion".to_string(), "Zoo.Lion.Sound()".to_string()),
        ]
    );

    // Both interfaces declare Feed(); only the first listed one is linked.
    let method_implements: Vec<(String, String)> = sorted_edges(store, EdgeKind::Implements)
        .await
        .into_iter()
        .filter(|(from, _)| from.ends_with(')'))
        .collect();
    assert_eq!(
        method_implements,
        vec![("Zoo.Lion.Feed()".to_string(), "Zoo.IFeed.Feed()".to_string())]
    );

    assert_eq!(
        store.edges(EdgeKind::Overrides).await.unwrap(),
        vec![("Zoo.Lion.Sound()".to_string(), "Zoo.Animal.Sound()".to_string())]
    );
    assert_eq!(
        store.edges(EdgeKind::Invokes).await.unwrap(),
        vec![("Zoo.Lion.Feed()".to_string(), "Zoo.Animal.Sleep()".to_string())]
    );

    // A second pass changes nothing.
    let before = store.stats().await.unwrap();
    persist(store, &elements).await;
    assert_eq!(store.stats().await.unwrap(), before);

    let mut registry = UnresolvedRegistry::new();
    let validation = Validator::new(store).validate(&elements, &mut registry).await;
    assert_eq!(validation.methods_checked, 6);
    assert_eq!(validation.snapshots_written, 6);
    assert!(registry.is_empty());
}

async fn check_dangling_edge(store: &dyn GraphStore) {
    store
        .upsert_node(ElementKind::Method, "A.M()", &PropertyMap::new())
        .await
        .unwrap();
    let outcome = store
        .upsert_edge(
            EdgeKind::Invokes,
            &Endpoint::labeled("A.M()", &[ElementKind::Method]),
            &Endpoint::labeled("Never.Written()", &[ElementKind::Method]),
            &PropertyMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(outcome, EdgeOutcome::MissingEndpoint);
    assert_eq!(store.find_node("Never.Written()").await.unwrap(), None);
    let stats = store.stats().await.unwrap();
    assert_eq!((stats.nodes, stats.edges), (1, 0));
}

#[tokio::test]
async fn test_zoo_graph_in_memory() {
    check_zoo_graph(&InMemoryStore::new()).await;
}

#[tokio::test]
async fn test_zoo_graph_surreal() {
    check_zoo_graph(&surreal().await).await;
}

#[tokio::test]
async fn test_dangling_edge_in_memory() {
    check_dangling_edge(&InMemoryStore::new()).await;
}

#[tokio::test]
async fn test_dangling_edge_surreal() {
    check_dangling_edge(&surreal().await).await;
}

#[tokio::test]
async fn test_surreal_store_on_disk_and_purge() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.db");
    let store = SurrealStore::open(&path, "test", "disk").await.unwrap();
    store.initialize().await.unwrap();
    persist(&store, &extract(&[("Zoo.cs", SOURCE)])).await;
    assert!(path.exists());
    assert_eq!(store.find_node("Zoo.Lion").await.unwrap(), Some(ElementKind::Class));

    store.purge().await.unwrap();
    assert_eq!(store.stats().await.unwrap().nodes, 0);
}
