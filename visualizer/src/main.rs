use iced::{
    mouse,
    widget::{
        button,
        canvas::{self, Canvas, Frame, Geometry, Path, Stroke},
        column, row, scrollable, text, text_input, Column, Container,
    },
    Alignment, Color, Element, Length, Pixels, Point, Rectangle, Renderer, Size, Task, Theme,
};
use trialcore::prelude::{
    ScenarioParams, DEFAULT_ITERATIONS, HIGH_ACCURACY, LARGE_SAMPLE_SIZE, LOW_ACCURACY,
    SMALL_SAMPLE_SIZE, TRUE_UTILIZATION,
};
use trialcore::simulation::{MonteCarloSampler, SamplingSummary};
use trialcore::visual::chart::{DensityChart, DEFAULT_GRID_POINTS, DEFAULT_TITLE};

const SERIES_COLORS: [Color; 4] = [
    Color::from_rgb(0.18, 0.72, 0.89),
    Color::from_rgb(0.95, 0.55, 0.2),
    Color::from_rgb(0.55, 0.85, 0.35),
    Color::from_rgb(0.85, 0.4, 0.75),
];
const FILL_ALPHA: f32 = 0.3;

fn main() -> iced::Result {
    iced::application(Visualizer::boot, Visualizer::update, Visualizer::view)
        .title(application_title)
        .theme(application_theme)
        .run()
}

fn application_title(_: &Visualizer) -> String {
    "Utilization Bias Visualizer".into()
}

fn application_theme(_: &Visualizer) -> Theme {
    Theme::Dark
}

fn series_color(index: usize) -> Color {
    SERIES_COLORS[index % SERIES_COLORS.len()]
}

#[derive(Debug)]
struct Visualizer {
    config: ConfigForm,
    outcome: Option<SimulationOutcome>,
    running: bool,
    status: String,
    history: Vec<String>,
}

#[derive(Debug, Clone)]
enum Message {
    ConfigFieldChanged(ConfigField, String),
    RunSimulation,
    SimulationFinished(Result<SimulationOutcome, String>),
}

#[derive(Debug, Clone, Copy)]
enum ConfigField {
    TrueUtilization,
    Iterations,
    Seed,
    SmallSampleSize,
    SmallAccuracy,
    LargeSampleSize,
    LargeAccuracy,
}

impl Visualizer {
    fn boot() -> (Self, Task<Message>) {
        let config = ConfigForm::default();
        let (task, running, status) = match config.to_request() {
            Ok(request) => (
                Task::perform(run_simulation(request), Message::SimulationFinished),
                true,
                "Running default scenarios...".to_string(),
            ),
            Err(err) => (Task::none(), false, format!("Config error: {err}")),
        };
        (
            Visualizer {
                config,
                outcome: None,
                running,
                status,
                history: Vec::new(),
            },
            task,
        )
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            Message::ConfigFieldChanged(field, value) => {
                state.config.update_field(field, value);
                Task::none()
            }
            Message::RunSimulation => {
                if state.running {
                    return Task::none();
                }
                match state.config.to_request() {
                    Ok(request) => {
                        state.running = true;
                        state.status = format!(
                            "Simulating {} iterations (seed {})...",
                            request.iterations, request.seed
                        );
                        Task::perform(run_simulation(request), Message::SimulationFinished)
                    }
                    Err(err) => {
                        state.status = format!("Config error: {err}");
                        Task::none()
                    }
                }
            }
            Message::SimulationFinished(Ok(outcome)) => {
                state.running = false;
                state.status = format!(
                    "Simulation complete: {} scenarios x {} iterations",
                    outcome.summaries.len(),
                    outcome.iterations
                );
                for (label, summary) in &outcome.summaries {
                    state.push_history(format!(
                        "{label}: mean {:.4}, bias {:+.4}",
                        summary.mean, summary.bias
                    ));
                }
                state.outcome = Some(outcome);
                Task::none()
            }
            Message::SimulationFinished(Err(err)) => {
                state.running = false;
                state.status = format!("Simulation error: {err}");
                Task::none()
            }
        }
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let run_button = if state.running {
            button("Running...").padding(10)
        } else {
            button("Run simulation")
                .on_press(Message::RunSimulation)
                .padding(10)
        };

        let config_column = column![
            text("Scenario Config").size(26),
            text_input("True utilization", &state.config.true_utilization)
                .on_input(|value| Message::ConfigFieldChanged(ConfigField::TrueUtilization, value))
                .padding(6),
            text_input("Iterations", &state.config.iterations)
                .on_input(|value| Message::ConfigFieldChanged(ConfigField::Iterations, value))
                .padding(6),
            text_input("Seed", &state.config.seed)
                .on_input(|value| Message::ConfigFieldChanged(ConfigField::Seed, value))
                .padding(6),
            text("Small & Accurate").size(16),
            text_input("Sample size", &state.config.small_sample_size)
                .on_input(|value| Message::ConfigFieldChanged(ConfigField::SmallSampleSize, value))
                .padding(6),
            text_input("Accuracy", &state.config.small_accuracy)
                .on_input(|value| Message::ConfigFieldChanged(ConfigField::SmallAccuracy, value))
                .padding(6),
            text("Large & Error-Prone").size(16),
            text_input("Sample size", &state.config.large_sample_size)
                .on_input(|value| Message::ConfigFieldChanged(ConfigField::LargeSampleSize, value))
                .padding(6),
            text_input("Accuracy", &state.config.large_accuracy)
                .on_input(|value| Message::ConfigFieldChanged(ConfigField::LargeAccuracy, value))
                .padding(6),
            run_button,
            text(&state.status).size(14),
            column![
                text("Parameter definitions").size(16),
                text("True utilization: population share exposed to the drug.").size(12),
                text("Iterations: Monte Carlo replications per scenario.").size(12),
                text("Seed: reapplied before each scenario so runs replay exactly.").size(12),
                text("Sample size: subjects drawn per simulated dataset.").size(12),
                text("Accuracy: chance a recorded label matches the true label.").size(12),
            ]
            .spacing(4)
            .padding(6),
        ]
        .spacing(10)
        .padding(16)
        .width(Length::Fixed(360.0));

        let chart_view: Element<'_, Message> = match &state.outcome {
            Some(outcome) => Canvas::new(DensityPlot {
                chart: outcome.chart.clone(),
            })
            .width(Length::Fill)
            .height(Length::Fixed(360.0))
            .into(),
            None => Container::new(text("No simulation yet").size(14))
                .height(Length::Fixed(360.0))
                .into(),
        };

        let legend = match &state.outcome {
            Some(outcome) => outcome.chart.series.iter().enumerate().fold(
                Column::new().spacing(4),
                |col, (idx, curve)| {
                    col.push(
                        text(format!(
                            "■ {} ({} samples, bandwidth {:.4})",
                            curve.label, curve.sample_count, curve.bandwidth
                        ))
                        .size(13)
                        .color(series_color(idx)),
                    )
                },
            ),
            None => Column::new(),
        };

        let summary_list = match &state.outcome {
            Some(outcome) if !outcome.summaries.is_empty() => outcome.summaries.iter().fold(
                Column::new().spacing(4),
                |col, (label, summary)| {
                    col.push(text(describe_summary(label, summary)).size(12))
                },
            ),
            _ => Column::new().push(text("No summaries yet").size(12)),
        };

        let history_list = if state.history.is_empty() {
            Column::new().push(text("No activity yet").size(12))
        } else {
            state
                .history
                .iter()
                .rev()
                .fold(Column::new().spacing(4), |col, entry| {
                    col.push(text(entry.clone()).size(12))
                })
        };

        let title = state
            .outcome
            .as_ref()
            .map(|outcome| outcome.chart.title.clone())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let chart_column = column![
            text(title).size(24),
            chart_view,
            text("x: estimated utilization rate | y: density").size(12),
            legend,
            text("Sampling summaries").size(16),
            Container::new(summary_list).padding(6),
            text("Activity log").size(16),
            Container::new(scrollable(history_list).height(Length::Fixed(90.0))).padding(6),
        ]
        .spacing(10)
        .padding(16)
        .width(Length::Fill);

        let layout = row![config_column, chart_column]
            .spacing(20)
            .align_y(Alignment::Start)
            .padding(20);

        Container::new(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }

    fn push_history(&mut self, entry: String) {
        self.history.push(entry);
        if self.history.len() > 20 {
            self.history.remove(0);
        }
    }
}

fn describe_summary(label: &str, summary: &SamplingSummary) -> String {
    format!(
        "{label}: mean {:.4} | sd {:.4} | 95% [{:.4}, {:.4}] | bias {:+.4} | expected {:.4}",
        summary.mean,
        summary.std_dev,
        summary.lower_95,
        summary.upper_95,
        summary.bias,
        summary.expected_observed_rate
    )
}

#[derive(Debug, Clone)]
struct SimulationRequest {
    iterations: usize,
    seed: u64,
    scenarios: Vec<(String, ScenarioParams)>,
}

#[derive(Debug, Clone)]
struct SimulationOutcome {
    iterations: usize,
    chart: DensityChart,
    summaries: Vec<(String, SamplingSummary)>,
}

/// Runs the CPU-bound sampler on tokio's blocking pool, off the UI executor.
async fn run_simulation(request: SimulationRequest) -> Result<SimulationOutcome, String> {
    tokio::task::spawn_blocking(move || simulate(request))
        .await
        .map_err(|err| format!("simulation task failed: {err}"))?
}

fn simulate(request: SimulationRequest) -> Result<SimulationOutcome, String> {
    let mut distributions = Vec::with_capacity(request.scenarios.len());
    for (label, params) in &request.scenarios {
        let distribution = MonteCarloSampler::new(label.as_str(), *params, request.iterations)
            .and_then(|sampler| sampler.run_seeded(request.seed))
            .map_err(|e| format!("{label}: {e}"))?;
        distributions.push(distribution);
    }

    let chart =
        DensityChart::from_distributions(DEFAULT_TITLE, &distributions, DEFAULT_GRID_POINTS)
            .map_err(|e| e.to_string())?;
    let summaries = distributions
        .iter()
        .map(|distribution| (distribution.label.clone(), distribution.summary()))
        .collect();

    Ok(SimulationOutcome {
        iterations: request.iterations,
        chart,
        summaries,
    })
}

#[derive(Debug, Clone)]
struct ConfigForm {
    true_utilization: String,
    iterations: String,
    seed: String,
    small_sample_size: String,
    small_accuracy: String,
    large_sample_size: String,
    large_accuracy: String,
}

impl ConfigForm {
    fn default() -> Self {
        Self {
            true_utilization: TRUE_UTILIZATION.to_string(),
            iterations: DEFAULT_ITERATIONS.to_string(),
            seed: "42".into(),
            small_sample_size: SMALL_SAMPLE_SIZE.to_string(),
            small_accuracy: HIGH_ACCURACY.to_string(),
            large_sample_size: LARGE_SAMPLE_SIZE.to_string(),
            large_accuracy: LOW_ACCURACY.to_string(),
        }
    }

    fn update_field(&mut self, field: ConfigField, value: String) {
        match field {
            ConfigField::TrueUtilization => self.true_utilization = value,
            ConfigField::Iterations => self.iterations = value,
            ConfigField::Seed => self.seed = value,
            ConfigField::SmallSampleSize => self.small_sample_size = value,
            ConfigField::SmallAccuracy => self.small_accuracy = value,
            ConfigField::LargeSampleSize => self.large_sample_size = value,
            ConfigField::LargeAccuracy => self.large_accuracy = value,
        }
    }

    fn to_request(&self) -> Result<SimulationRequest, String> {
        let true_utilization: f64 = parse_field("true utilization", &self.true_utilization)?;
        let iterations: usize = parse_field("iterations", &self.iterations)?;
        let seed: u64 = parse_field("seed", &self.seed)?;

        let small = ScenarioParams::new(
            true_utilization,
            parse_field("small sample size", &self.small_sample_size)?,
            parse_field("small accuracy", &self.small_accuracy)?,
        )
        .map_err(|e| format!("Small & Accurate: {e}"))?;
        let large = ScenarioParams::new(
            true_utilization,
            parse_field("large sample size", &self.large_sample_size)?,
            parse_field("large accuracy", &self.large_accuracy)?,
        )
        .map_err(|e| format!("Large & Error-Prone: {e}"))?;

        if iterations == 0 {
            return Err("iterations must be at least 1".into());
        }

        Ok(SimulationRequest {
            iterations,
            seed,
            scenarios: vec![
                ("Small & Accurate".into(), small),
                ("Large & Error-Prone".into(), large),
            ],
        })
    }
}

fn parse_field<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("{name}: cannot parse {raw:?}"))
}

/// Maps chart coordinates into a padded canvas area.
struct PlotArea {
    origin: Point,
    size: Size,
    x_range: (f64, f64),
    y_max: f64,
}

impl PlotArea {
    fn new(bounds: Size, x_range: (f64, f64), y_max: f64) -> Self {
        let padding = 36.0;
        Self {
            origin: Point::new(padding, 12.0),
            size: Size::new(
                (bounds.width - padding - 12.0).max(1.0),
                (bounds.height - padding - 12.0).max(1.0),
            ),
            x_range,
            y_max: if y_max > 0.0 { y_max * 1.1 } else { 1.0 },
        }
    }

    fn project(&self, x: f64, y: f64) -> Point {
        let span = (self.x_range.1 - self.x_range.0).max(f64::EPSILON);
        let nx = ((x - self.x_range.0) / span).clamp(0.0, 1.0) as f32;
        let ny = (y / self.y_max).clamp(0.0, 1.0) as f32;
        Point::new(
            self.origin.x + nx * self.size.width,
            self.origin.y + self.size.height - ny * self.size.height,
        )
    }

    fn baseline(&self) -> f32 {
        self.origin.y + self.size.height
    }
}

#[derive(Clone)]
struct DensityPlot {
    chart: DensityChart,
}

impl canvas::Program<Message> for DensityPlot {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(
            Point::ORIGIN,
            bounds.size(),
            Color::from_rgb(0.05, 0.05, 0.05),
        );

        let area = PlotArea::new(bounds.size(), self.chart.x_range, self.chart.y_max);
        let axes = Path::new(|builder| {
            builder.move_to(Point::new(area.origin.x, area.origin.y));
            builder.line_to(Point::new(area.origin.x, area.baseline()));
            builder.line_to(Point::new(area.origin.x + area.size.width, area.baseline()));
        });
        frame.stroke(
            &axes,
            Stroke::default()
                .with_color(Color::from_rgb(0.35, 0.35, 0.45))
                .with_width(1.0),
        );

        for tick in 0..=4 {
            let fraction = tick as f64 / 4.0;
            let (x_lower, x_upper) = self.chart.x_range;
            let x = x_lower + fraction * (x_upper - x_lower);
            let anchor = area.project(x, 0.0);
            frame.fill_text(canvas::Text {
                content: format!("{x:.3}"),
                position: Point::new(anchor.x - 14.0, anchor.y + 6.0),
                color: Color::from_rgb(0.7, 0.7, 0.75),
                size: Pixels(11.0),
                ..canvas::Text::default()
            });
        }

        for (idx, curve) in self.chart.series.iter().enumerate() {
            if curve.points.len() < 2 {
                continue;
            }
            let color = series_color(idx);

            let area_path = Path::new(|builder| {
                let (first_x, _) = curve.points[0];
                builder.move_to(area.project(first_x, 0.0));
                for &(x, y) in &curve.points {
                    builder.line_to(area.project(x, y));
                }
                if let Some(&(last_x, _)) = curve.points.last() {
                    builder.line_to(area.project(last_x, 0.0));
                }
                builder.close();
            });
            frame.fill(&area_path, Color { a: FILL_ALPHA, ..color });

            let outline = Path::new(|builder| {
                for (i, &(x, y)) in curve.points.iter().enumerate() {
                    let point = area.project(x, y);
                    if i == 0 {
                        builder.move_to(point);
                    } else {
                        builder.line_to(point);
                    }
                }
            });
            frame.stroke(&outline, Stroke::default().with_width(2.5).with_color(color));
        }

        vec![frame.into_geometry()]
    }
}
