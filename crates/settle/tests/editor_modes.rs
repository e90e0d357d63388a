//! Editor mode scenarios against a simulated block editor.
//!
//! The simulated editor keeps its state in a model and re-renders the whole
//! document after every change. Every reaction lands after a delay, so each
//! scenario only passes if the harness waits for the UI to settle.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use settle::mock::{Document, El, MockUi, UiEvent};
use settle::{
    BaselineSetup, ErrorKind, FailureMode, Predicate, Reporter, RunnerConfig, Scenario,
    ScenarioRunner, ScenarioState, Selector, SettleResult, Step, StepStatus, StepsBaseline, Suite,
    TimingConfig, WaitSpec,
};

const SUITE: &str = include_str!("../../../demos/editor-modes.yaml");

const PARAGRAPH: &str = ".block-editor-block-list__layout .block-editor-block-list__block.rich-text";
const HTML_TEXTAREA: &str = ".block-editor-block-list__block-html-textarea";
const MORE_OPTIONS: &str = r#".block-editor-block-toolbar button[aria-label="More options"]"#;
const FONT_SIZES: [&str; 6] = ["Default", "Small", "Normal", "Medium", "Large", "Huge"];

// ============================================================================
// Simulated editor
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Tab {
    #[default]
    Document,
    Block,
}

#[derive(Debug, Clone, Default)]
struct Block {
    text: String,
    html: bool,
    size: usize,
}

impl Block {
    fn markup(&self) -> String {
        match FONT_SIZES[self.size] {
            "Default" => format!("<p>{}</p>", self.text),
            size => format!(
                "<p class=\"has-{}-font-size\">{}</p>",
                size.to_lowercase(),
                self.text
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Model {
    block: Option<Block>,
    selected: bool,
    toolbar: bool,
    block_menu: bool,
    more_menu: bool,
    size_list: bool,
    code_editor: bool,
    tab: Tab,
}

impl Model {
    fn render(&self) -> Vec<El> {
        vec![self.header(), self.canvas(), self.sidebar()]
    }

    fn header(&self) -> El {
        let mut inserter = El::new("button").attr("aria-label", "Add block");
        if self.code_editor {
            inserter = inserter.attr("aria-disabled", "true");
        }
        let mut more = El::new("div").class("edit-post-more-menu").child(
            El::new("button").attr("aria-label", "Options"),
        );
        if self.more_menu {
            more = more.child(El::new("div").class("components-dropdown-menu__menu").children([
                El::new("button").text("Visual editor"),
                El::new("button").text("Code editor"),
            ]));
        }
        El::new("div")
            .class("edit-post-header")
            .child(El::new("div").class("block-editor-inserter").child(inserter))
            .child(more)
    }

    fn canvas(&self) -> El {
        if self.code_editor {
            let markup = self.block.as_ref().map(Block::markup).unwrap_or_default();
            return El::new("div").class("edit-post-text-editor").child(
                El::new("textarea")
                    .class("editor-post-text-editor")
                    .text(format!("<!-- wp:paragraph -->\n{markup}\n<!-- /wp:paragraph -->")),
            );
        }

        let content = match &self.block {
            None => El::new("p")
                .class("block-editor-default-block-appender__content")
                .text("Start writing or type / to choose a block"),
            Some(block) if block.html => El::new("textarea")
                .class("block-editor-block-list__block-html-textarea")
                .text(block.markup()),
            Some(block) => {
                let mut p = El::new("p")
                    .class("block-editor-block-list__block")
                    .class("rich-text")
                    .text(block.text.clone());
                if self.selected {
                    p = p.class("is-selected").focused();
                }
                p
            }
        };

        let mut canvas = El::new("div")
            .class("edit-post-visual-editor")
            .child(El::new("div").class("block-editor-block-list__layout").child(content));
        if self.toolbar && self.selected {
            canvas = canvas.child(
                El::new("div")
                    .class("block-editor-block-toolbar")
                    .child(El::new("button").attr("aria-label", "More options")),
            );
        }
        if self.block_menu {
            let html = self.block.as_ref().is_some_and(|b| b.html);
            canvas = canvas.child(
                El::new("div")
                    .class("block-editor-block-settings-menu__popover")
                    .children([
                        El::new("button").text("Duplicate"),
                        El::new("button").text(if html { "Edit visually" } else { "Edit as HTML" }),
                    ]),
            );
        }
        canvas
    }

    fn sidebar(&self) -> El {
        let tab = |label: &str, active: bool| {
            let mut el = El::new("button")
                .class("edit-post-sidebar__panel-tab")
                .attr("data-label", label)
                .text(label);
            if active {
                el = el.class("is-active");
            }
            el
        };
        let tabs = El::new("ul").children([
            tab("Document", self.tab == Tab::Document),
            tab("Block", self.tab == Tab::Block),
        ]);

        let panel = match (self.tab, self.selected, &self.block) {
            (Tab::Block, true, Some(block)) => {
                let mut controls = El::new("div")
                    .class("components-font-size-picker__controls")
                    .child(
                        El::new("button")
                            .class("components-font-size-picker__select")
                            .text(FONT_SIZES[block.size]),
                    );
                if self.size_list {
                    controls = controls.child(
                        El::new("ul")
                            .class("components-custom-select-control__menu")
                            .children(FONT_SIZES.iter().map(|name| {
                                El::new("li")
                                    .class("components-custom-select-control__item")
                                    .text(*name)
                            })),
                    );
                }
                El::new("div").class("block-editor-block-inspector").children([
                    El::new("div")
                        .class("block-editor-block-card")
                        .child(El::new("h2").class("block-editor-block-card__title").text("Paragraph")),
                    El::new("div").class("components-font-size-picker").child(controls),
                ])
            }
            (Tab::Block, ..) => El::new("span")
                .class("block-editor-block-inspector__no-blocks")
                .text("No block selected."),
            (Tab::Document, ..) => El::new("div")
                .class("edit-post-post-status")
                .text("Status & visibility"),
        };

        El::new("div").class("edit-post-sidebar").children([tabs, panel])
    }
}

/// Editor wired onto a [`MockUi`]
#[derive(Debug, Clone)]
struct Editor {
    ui: MockUi,
    model: Arc<Mutex<Model>>,
}

impl Editor {
    fn new() -> Self {
        let model = Model::default();
        let editor = Self {
            ui: MockUi::new(El::new("body").children(model.render())),
            model: Arc::new(Mutex::new(model)),
        };
        editor.install();
        editor
    }

    /// Register a reaction that edits the model and re-renders
    fn react<F>(&self, css: &str, delay_ms: u64, edit: F)
    where
        F: Fn(&mut Model, &Document, &UiEvent) + Send + Sync + 'static,
    {
        let model = Arc::clone(&self.model);
        self.ui
            .on_click(css, Duration::from_millis(delay_ms), move |doc, event| {
                let mut model = model.lock().unwrap();
                edit(&mut model, doc, event);
                render(doc, &model);
            })
            .unwrap();
    }

    fn install(&self) {
        self.react(".block-editor-default-block-appender__content", 40, |m, _, _| {
            m.block = Some(Block::default());
            m.selected = true;
            m.tab = Tab::Block;
        });

        let model = Arc::clone(&self.model);
        self.ui
            .on_typed(Duration::from_millis(60), move |doc, event| {
                let mut m = model.lock().unwrap();
                if let (UiEvent::Typed { text, .. }, Some(block)) = (event, m.block.as_mut()) {
                    if !block.html {
                        block.text.push_str(text);
                    }
                }
                render(doc, &m);
            })
            .unwrap();

        let model = Arc::clone(&self.model);
        self.ui
            .on_pointer_path(2, Duration::from_millis(30), move |doc, _| {
                let mut m = model.lock().unwrap();
                m.toolbar = m.selected;
                render(doc, &m);
            })
            .unwrap();

        self.react(MORE_OPTIONS, 50, |m, _, _| m.block_menu = !m.block_menu);

        self.react(".block-editor-block-settings-menu__popover button", 80, |m, doc, event| {
            let label = clicked_text(doc, event);
            if let Some(block) = m.block.as_mut() {
                match label.as_str() {
                    "Edit as HTML" => block.html = true,
                    "Edit visually" => block.html = false,
                    _ => {}
                }
            }
            m.block_menu = false;
            m.toolbar = false;
        });

        self.react(".components-font-size-picker__select", 40, |m, _, _| {
            m.size_list = !m.size_list;
        });

        self.react(".components-custom-select-control__item", 70, |m, doc, event| {
            let label = clicked_text(doc, event);
            if let (Some(block), Some(size)) = (
                m.block.as_mut(),
                FONT_SIZES.iter().position(|name| *name == label),
            ) {
                block.size = size;
            }
            m.size_list = false;
        });

        self.react(r#".edit-post-more-menu button[aria-label="Options"]"#, 30, |m, _, _| {
            m.more_menu = !m.more_menu;
        });

        self.react(".components-dropdown-menu__menu button", 70, |m, doc, event| {
            match clicked_text(doc, event).as_str() {
                "Code editor" => {
                    m.code_editor = true;
                    m.selected = false;
                    m.toolbar = false;
                    m.block_menu = false;
                    m.tab = Tab::Document;
                }
                "Visual editor" => m.code_editor = false,
                _ => {}
            }
            m.more_menu = false;
        });

        self.react(".edit-post-sidebar__panel-tab", 20, |m, doc, event| {
            m.tab = match clicked_text(doc, event).as_str() {
                "Block" => Tab::Block,
                _ => Tab::Document,
            };
        });
    }

    /// Fresh post: no blocks, visual mode
    fn reset(&self) -> SettleResult<()> {
        let mut model = self.model.lock().unwrap();
        *model = Model::default();
        self.ui.update(|doc| render(doc, &model))
    }

    fn model(&self) -> Model {
        self.model.lock().unwrap().clone()
    }
}

fn render(doc: &mut Document, model: &Model) {
    let root = doc.root();
    doc.replace_children(root, model.render());
}

fn clicked_text(doc: &Document, event: &UiEvent) -> String {
    match event {
        UiEvent::Click { target } => doc.text_content(*target).trim().to_string(),
        _ => String::new(),
    }
}

/// Reset the editor, then replay the suite baseline
struct EditorBaseline {
    editor: Editor,
    steps: StepsBaseline,
}

#[async_trait]
impl BaselineSetup<MockUi> for EditorBaseline {
    async fn establish(&self, driver: &MockUi, timing: &TimingConfig) -> SettleResult<()> {
        self.editor.reset()?;
        self.steps.establish(driver, timing).await
    }
}

fn setup(suite: &Suite, config: RunnerConfig) -> (Editor, EditorBaseline, ScenarioRunner<MockUi>) {
    let editor = Editor::new();
    let baseline = EditorBaseline {
        editor: editor.clone(),
        steps: StepsBaseline::new(suite.baseline.clone()),
    };
    let runner = ScenarioRunner::new(editor.ui.clone(), config.with_timing(suite.timing));
    (editor, baseline, runner)
}

fn suite() -> Suite {
    let suite = Suite::from_yaml(SUITE).unwrap();
    suite.validate().unwrap();
    suite
}

// ============================================================================
// Demo suite
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_demo_suite_passes() {
    let suite = suite();
    let (_editor, baseline, runner) = setup(&suite, RunnerConfig::default());
    let mut reporter = Reporter::new().with_name(&suite.name);

    let summary = runner.run_all(&suite, &baseline, &mut reporter).await.unwrap();

    for result in &summary.results {
        assert!(
            result.passed(),
            "{} did not pass: {:?}",
            result.scenario_name,
            result.failure_reason()
        );
    }
    assert_eq!(summary.passed(), 4);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(reporter.summary(), "editor modes: 4/4 passed");
}

#[tokio::test(start_paused = true)]
async fn test_filtered_code_editor_scenario() {
    let suite = suite().filter("code editor");
    let (editor, baseline, runner) = setup(&suite, RunnerConfig::default());

    let result = runner
        .run_with_baseline(&suite.scenarios[0], &baseline)
        .await;

    assert_eq!(result.state, ScenarioState::Passed, "{:?}", result.failure_reason());
    let model = editor.model();
    assert!(model.code_editor);
    assert!(!model.selected);
    assert_eq!(model.tab, Tab::Block);
}

// ============================================================================
// Rust-built scenarios
// ============================================================================

fn open_block_menu() -> [Step; 2] {
    [
        Step::mouse_move([(0.0, 0.0), (10.0, 10.0)]),
        Step::click(Selector::css(MORE_OPTIONS)),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_html_round_trip_keeps_one_surface() {
    let suite = suite();
    let (editor, baseline, runner) = setup(&suite, RunnerConfig::default());
    let surfaces = Selector::css(&format!("{PARAGRAPH}, {HTML_TEXTAREA}"));

    let scenario = Scenario::builder("round trip")
        .steps(open_block_menu())
        .step(Step::click(Selector::text_within("button", "Edit as HTML")))
        .step(Step::assert_text(Selector::css(HTML_TEXTAREA), "<p>Hello world!</p>"))
        .step(Step::assert_count(surfaces.clone(), 1))
        .steps(open_block_menu())
        .step(Step::click(Selector::text_within("button", "Edit visually")))
        .step(Step::wait_for(WaitSpec::new(
            Selector::css(HTML_TEXTAREA),
            Predicate::Absent,
        )))
        .step(Step::assert_count(surfaces, 1))
        .step(Step::assert_text(Selector::css(PARAGRAPH), "Hello world!"))
        .build();

    let result = runner.run_with_baseline(&scenario, &baseline).await;

    assert!(result.passed(), "{:?}", result.failure_reason());
    assert_eq!(result.outcomes.len(), scenario.steps().len());
    assert!(!editor.model().block.unwrap().html);
}

#[tokio::test(start_paused = true)]
async fn test_font_size_class_reaches_markup() {
    let suite = suite();
    let (_editor, baseline, runner) = setup(&suite, RunnerConfig::default());

    let scenario = Scenario::builder("huge")
        .step(Step::click(Selector::css(".components-font-size-picker__select")))
        .step(Step::click(Selector::css(
            ".components-custom-select-control__item:nth-child(6)",
        )))
        .step(Step::assert_text(
            Selector::css(".components-font-size-picker__select"),
            "Huge",
        ))
        .steps(open_block_menu())
        .step(Step::click(Selector::text_within("button", "Edit as HTML")))
        .step(Step::assert_text(
            Selector::css(HTML_TEXTAREA),
            "<p class=\"has-huge-font-size\">Hello world!</p>",
        ))
        .build();

    let result = runner.run_with_baseline(&scenario, &baseline).await;
    assert!(result.passed(), "{:?}", result.failure_reason());
}

#[tokio::test(start_paused = true)]
async fn test_wrong_markup_reports_observed_value() {
    let suite = suite();
    let (_editor, baseline, runner) = setup(&suite, RunnerConfig::default());

    let scenario = Scenario::builder("wrong markup")
        .steps(open_block_menu())
        .step(Step::click(Selector::text_within("button", "Edit as HTML")))
        .step(Step::AssertEqual {
            selector: Selector::css(HTML_TEXTAREA),
            property: settle::Property::Text,
            expected: "<p class=\"has-large-font-size\">Hello world!</p>".into(),
            timeout_ms: Some(500),
        })
        .build();

    let result = runner.run_with_baseline(&scenario, &baseline).await;

    assert_eq!(result.state, ScenarioState::Failed);
    let failed = result.failed_step().unwrap();
    assert_eq!(failed.index, 3);
    assert_eq!(failed.status, StepStatus::Fail);
    assert_eq!(failed.error_kind, Some(ErrorKind::AssertionMismatch));
    let mismatch = failed.mismatch.as_ref().unwrap();
    assert_eq!(mismatch.observed, "<p>Hello world!</p>");
}

#[tokio::test(start_paused = true)]
async fn test_toolbar_needs_pointer_movement() {
    let mut suite = suite();
    suite.timing = suite.timing.with_action_timeout(300);
    let (_editor, baseline, runner) = setup(&suite, RunnerConfig::default());

    let scenario = Scenario::builder("no pointer")
        .step(Step::click(Selector::css(MORE_OPTIONS)))
        .build();

    let result = runner.run_with_baseline(&scenario, &baseline).await;

    assert_eq!(result.state, ScenarioState::TimedOut);
    assert_eq!(result.failed_step().unwrap().status, StepStatus::Timeout);
}

#[tokio::test(start_paused = true)]
async fn test_inserter_click_is_ignored_in_code_editor() {
    let suite = suite().filter("code editor");
    let (editor, baseline, runner) = setup(&suite, RunnerConfig::default());

    let scenario = Scenario::builder("inserter")
        .steps(suite.scenarios[0].steps().iter().cloned())
        .step(Step::click(Selector::css(".block-editor-inserter > button")))
        .build();

    let result = runner.run_with_baseline(&scenario, &baseline).await;

    assert!(result.passed(), "{:?}", result.failure_reason());
    assert!(editor.ui.was_called("click:"));
    assert!(editor.model().code_editor);
}

// ============================================================================
// Lost surface
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_closed_editor_stops_the_run() {
    let suite = suite();
    let (editor, baseline, runner) = setup(&suite, RunnerConfig::default());
    editor
        .ui
        .on_click(
            r#".edit-post-more-menu button[aria-label="Options"]"#,
            Duration::from_millis(10),
            |doc, _| doc.close(),
        )
        .unwrap();
    let mut reporter = Reporter::new().with_name(&suite.name);

    let summary = runner.run_all(&suite, &baseline, &mut reporter).await.unwrap();

    assert_eq!(summary.passed(), 3);
    let last = summary.results.last().unwrap();
    assert!(last.fatal);
    assert_eq!(
        last.failed_step().unwrap().error_kind,
        Some(ErrorKind::SurfaceUnavailable)
    );
    assert!(summary.fatal.is_some());
    assert_eq!(reporter.exit_code(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fail_fast_skips_the_rest() {
    let mut suite = suite();
    suite.scenarios.insert(
        0,
        Scenario::builder("never settles")
            .step(Step::AssertCount {
                selector: Selector::css(HTML_TEXTAREA),
                expected: 1,
                timeout_ms: Some(200),
            })
            .build(),
    );
    let config = RunnerConfig::default().with_failure_mode(FailureMode::AndonCord);
    let (_editor, baseline, runner) = setup(&suite, config);
    let mut reporter = Reporter::new();

    let summary = runner.run_all(&suite, &baseline, &mut reporter).await.unwrap();

    assert_eq!(summary.results.len(), 1);
    assert_eq!(summary.skipped.len(), 4);
    assert!(reporter.render_text().contains("SKIP toggles between visual and HTML modes"));
}
