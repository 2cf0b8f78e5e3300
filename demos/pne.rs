use clap::{Parser, ValueEnum};

use pne_rs::extractor::{ExtractorConfig, PredicateExtractor, OVER_APPROX_THRESHOLD};
use pne_rs::hierarchy::{AssignKind, FlatHierarchy};
use pne_rs::node::{BinaryOp, UnaryOp};
use pne_rs::normaliser::PredicateNormaliser;
use pne_rs::reference::{Context, ExprRef};
use pne_rs::store::ExprStore;
use pne_rs::symb_table::SymbTable;
use pne_rs::types::SymbType;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for simplelog::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => simplelog::LevelFilter::Error,
            LogLevel::Warn => simplelog::LevelFilter::Warn,
            LogLevel::Info => simplelog::LevelFilter::Info,
            LogLevel::Debug => simplelog::LevelFilter::Debug,
            LogLevel::Trace => simplelog::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Largest Cartesian product enumerated by the extractor.
    #[clap(long, value_name = "INT", default_value_t = OVER_APPROX_THRESHOLD)]
    threshold: usize,

    /// Never over-approximate.
    #[clap(long)]
    no_approx: bool,

    /// Keep definitions by name when normalising.
    #[clap(long)]
    no_expand: bool,

    #[clap(long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        args.log_level.into(),
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    println!("args = {:?}", args);

    let store = ExprStore::default();
    let n = |value: i64| store.mk_number(value);

    // VAR a, x : 0..7; b, c : boolean; i : 0..2; w : word[4]; v : array 0..2 of 0..7;
    // DEFINE sum := a + x;
    let mut st = SymbTable::new(&store);
    let (a, x, b, c, i, w, v) = (
        store.mk_atom("a"),
        store.mk_atom("x"),
        store.mk_atom("b"),
        store.mk_atom("c"),
        store.mk_atom("i"),
        store.mk_atom("w"),
        store.mk_atom("v"),
    );
    st.declare_var(a, SymbType::range(0, 7));
    st.declare_var(x, SymbType::range(0, 7));
    st.declare_var(b, SymbType::Boolean);
    st.declare_var(c, SymbType::Boolean);
    st.declare_var(i, SymbType::range(0, 2));
    st.declare_var(w, SymbType::word(4));
    st.declare_var_array(v, 0, 2, SymbType::range(0, 7));
    let sum = store.mk_atom("sum");
    st.declare_define(sum, store.mk_plus(a, x), Context::ROOT);

    let exprs: Vec<ExprRef> = vec![
        // (b ? a : a + 1) = 2
        store.mk_equal(store.mk_case(b, a, store.mk_plus(a, n(1))), n(2)),
        // v[i] + 1 = x
        store.mk_equal(store.mk_plus(store.mk_array(v, i), n(1)), x),
        // sum < 5 & bool(w[0:0])
        store.mk_and(
            store.mk_binary(BinaryOp::Lt, sum, n(5)),
            store.mk_unary(UnaryOp::CastBool, store.mk_bit_select(w, n(0), n(0))),
        ),
    ];

    println!("\n=== Normalisation ===");
    let mut pn = PredicateNormaliser::new(&store, &st);
    for &e in &exprs {
        let normal = pn.normalise_expr(e, !args.no_expand)?;
        println!("{}", store.display(e));
        println!("  ~> {}", store.display(normal));
        let preds = pn.predicates_only(normal)?;
        for p in preds {
            println!("     predicate {}", store.display(p));
        }
    }
    println!(
        "normaliser memo: {} entries, {} hits, {} misses",
        pn.memo().len(),
        pn.memo().hits(),
        pn.memo().misses()
    );

    println!("\n=== Extraction ===");
    let config = ExtractorConfig {
        use_approx: !args.no_approx,
        threshold: args.threshold,
    };
    let mut pe = PredicateExtractor::with_config(&store, &st, config);
    for &e in &exprs {
        let res = pe.compute_preds(e)?;
        println!("{} -> {:?}", store.display(e), res);
    }

    // INIT a = 0; TRANS next(a) = (c ? a + 1 : 0); ASSIGN next(x) := b ? x : x + 1;
    let mut fh = FlatHierarchy::new();
    fh.init.push(store.mk_equal(a, n(0)));
    fh.trans.push(store.mk_equal(
        store.mk_next(a),
        store.mk_case(c, store.mk_plus(a, n(1)), n(0)),
    ));
    fh.assign(AssignKind::Next, x, store.mk_case(b, x, store.mk_plus(x, n(1))));
    pe.extract_from_hierarchy(&fh)?;
    println!("{} predicates extracted", pe.all_preds().len());

    println!("\n=== Clusters ===");
    pe.write_report(&mut std::io::stdout().lock(), true, true)?;

    Ok(())
}
