use std::collections::BTreeMap;

use eframe::egui::{Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};
use egui_plot::{Bar, BarChart, Legend, Plot};

use crate::color::ColorMap;
use crate::data::age::AgeBucket;
use crate::data::aggregate::{CountTable, HistogramTable, MeanTable, RateTable};
use crate::data::pipeline::{AggregateTable, TableId};
use crate::state::AppState;

const CHART_HEIGHT: f32 = 220.0;

// ---------------------------------------------------------------------------
// Dashboard (central panel)
// ---------------------------------------------------------------------------

/// Render every dashboard table in the central panel.
pub fn dashboard(ui: &mut Ui, state: &AppState) {
    let Some(tables) = &state.tables else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Abra um arquivo do CAGED  (Arquivo → Abrir…)");
        });
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for id in TableId::ALL {
                ui.heading(id.title());
                match tables.get(id) {
                    Some(Ok(table)) if table.row_count() == 0 => {
                        ui.label("Sem dados para os filtros selecionados.");
                    }
                    Some(Ok(table)) => table_chart(ui, id, table),
                    Some(Err(err)) => {
                        ui.label(RichText::new(format!("Erro: {err}")).color(Color32::RED));
                    }
                    None => {}
                }
                ui.separator();
            }
        });
}

fn table_chart(ui: &mut Ui, id: TableId, table: &AggregateTable) {
    match table {
        AggregateTable::Rate(t) => {
            rate_chart(ui, id, t);
            rate_grid(ui, t);
        }
        AggregateTable::Count(t) => count_chart(ui, id, t),
        AggregateTable::Mean(t) => mean_chart(ui, id, t),
        AggregateTable::Histogram(t) => histogram_chart(ui, id, t),
    }
}

// ---------------------------------------------------------------------------
// Category × series layout shared by the bar charts
// ---------------------------------------------------------------------------

/// Values laid out on a categorical x axis, one map per series.
struct CategorySeries {
    categories: Vec<String>,
    series: BTreeMap<String, BTreeMap<usize, f64>>,
}

impl CategorySeries {
    /// The first key element is the category; the remaining ones, joined,
    /// name the series.
    fn from_keyed<'a>(rows: impl IntoIterator<Item = (&'a [String], f64)>) -> Self {
        let rows: Vec<(&[String], f64)> = rows.into_iter().collect();
        let mut categories: Vec<String> = rows
            .iter()
            .filter_map(|(key, _)| key.first().cloned())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        // Age buckets read left to right in age order, not string order.
        categories.sort_by_key(|c| AgeBucket::from_label(c).map(AgeBucket::index));

        let mut series: BTreeMap<String, BTreeMap<usize, f64>> = BTreeMap::new();
        for (key, value) in rows {
            let Some((category, rest)) = key.split_first() else {
                continue;
            };
            let Some(position) = categories.iter().position(|c| c == category) else {
                continue;
            };
            let label = if rest.is_empty() {
                "Total".to_string()
            } else {
                rest.join(" / ")
            };
            *series.entry(label).or_default().entry(position).or_insert(0.0) += value;
        }

        Self { categories, series }
    }

    fn color_map(&self) -> ColorMap {
        ColorMap::new(self.series.keys().map(String::as_str))
    }

    /// Side-by-side bars, one slot per series inside each category.
    fn grouped(&self, value_label: &'static str) -> Vec<BarChart> {
        let colors = self.color_map();
        let n = self.series.len().max(1) as f64;
        let width = 0.8 / n;

        self.series
            .iter()
            .enumerate()
            .map(|(slot, (label, values))| {
                let offset = -0.4 + width * (slot as f64 + 0.5);
                let bars = values
                    .iter()
                    .map(|(&position, &value)| {
                        Bar::new(position as f64 + offset, value)
                            .width(width)
                            .name(&self.categories[position])
                    })
                    .collect();
                let series_label = label.clone();
                BarChart::new(bars)
                    .name(label)
                    .color(colors.color_for(label))
                    .element_formatter(Box::new(move |bar, _chart| {
                        format!("{}\n{series_label}: {:.2} {value_label}", bar.name, bar.value)
                    }))
            })
            .collect()
    }

    /// Bars stacked per category; every series gets a bar in every category
    /// so the stacking offsets line up.
    fn stacked(&self) -> Vec<BarChart> {
        let colors = self.color_map();
        let mut charts: Vec<BarChart> = Vec::new();

        for (label, values) in &self.series {
            let bars = (0..self.categories.len())
                .map(|position| {
                    Bar::new(position as f64, values.get(&position).copied().unwrap_or(0.0))
                        .width(0.7)
                        .name(&self.categories[position])
                })
                .collect();
            let series_label = label.clone();
            let chart = BarChart::new(bars)
                .name(label)
                .color(colors.color_for(label))
                .element_formatter(Box::new(move |bar, _chart| {
                    format!("{}\n{series_label}: {}", bar.name, bar.value)
                }));
            let below: Vec<&BarChart> = charts.iter().collect();
            let chart = chart.stack_on(&below);
            charts.push(chart);
        }
        charts
    }
}

fn category_plot(
    ui: &mut Ui,
    id: TableId,
    categories: Vec<String>,
    y_label: &str,
    charts: Vec<BarChart>,
) {
    Plot::new(format!("{id:?}"))
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .y_axis_label(y_label)
        .allow_drag(false)
        .allow_scroll(false)
        .x_axis_formatter(move |mark, _range| {
            let index = mark.value.round();
            if (mark.value - index).abs() > 1e-6 || index < 0.0 {
                return String::new();
            }
            categories.get(index as usize).cloned().unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
        });
}

// ---------------------------------------------------------------------------
// Per-kind charts
// ---------------------------------------------------------------------------

/// Grouped bars: age bucket on x, one series per gender/year.
fn rate_chart(ui: &mut Ui, id: TableId, table: &RateTable) {
    let categories: Vec<String> = AgeBucket::ordered()
        .iter()
        .map(|b| b.label().to_string())
        .collect();
    let mut series: BTreeMap<String, BTreeMap<usize, f64>> = BTreeMap::new();
    for row in &table.rows {
        series
            .entry(format!("{} {}", row.gender, row.year))
            .or_default()
            .insert(row.age_bucket.index(), row.rate);
    }
    let layout = CategorySeries {
        categories: categories.clone(),
        series,
    };
    category_plot(ui, id, categories, "Taxa (%)", layout.grouped("%"));
}

fn rate_grid(ui: &mut Ui, table: &RateTable) {
    let headers = ["Sexo", "Faixa Etária", "Ano", "Desligamentos", "Total", "Taxa (%)"];
    ui.push_id("rate_grid", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .vscroll(false)
            .columns(TableColumn::auto().at_least(80.0), headers.len())
            .header(20.0, |mut header| {
                for title in headers {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for row in &table.rows {
                    body.row(18.0, |mut table_row| {
                        let cells = [
                            row.gender.clone(),
                            row.age_bucket.to_string(),
                            row.year.to_string(),
                            row.terminations.to_string(),
                            row.total.to_string(),
                            format!("{:.2}", row.rate),
                        ];
                        for cell in cells {
                            table_row.col(|ui| {
                                ui.label(cell);
                            });
                        }
                    });
                }
            });
    });
}

fn count_chart(ui: &mut Ui, id: TableId, table: &CountTable) {
    let layout = CategorySeries::from_keyed(
        table
            .rows
            .iter()
            .map(|row| (row.key.as_slice(), row.count as f64)),
    );
    let y_label = "Movimentações";
    let charts = layout.stacked();
    category_plot(ui, id, layout.categories, y_label, charts);
    if let Some(first) = table.columns.first() {
        ui.label(RichText::new(format!("Eixo x: {first}")).weak());
    }
}

fn mean_chart(ui: &mut Ui, id: TableId, table: &MeanTable) {
    let layout = CategorySeries::from_keyed(
        table
            .rows
            .iter()
            .map(|row| (row.key.as_slice(), row.mean)),
    );
    let charts = layout.grouped("R$");
    category_plot(ui, id, layout.categories, "Salário médio (R$)", charts);
}

fn histogram_chart(ui: &mut Ui, id: TableId, table: &HistogramTable) {
    let width = table.bin_width;
    let bars: Vec<Bar> = table
        .bins
        .iter()
        .map(|bin| {
            Bar::new(bin.lower + width / 2.0, bin.count as f64)
                .width(width)
                .name(format!("{:.0}–{:.0}", bin.lower, bin.lower + width))
        })
        .collect();
    let chart = BarChart::new(bars)
        .name(&table.column)
        .color(Color32::LIGHT_BLUE)
        .element_formatter(Box::new(|bar, _chart| {
            format!("{}\nContagem: {}", bar.name, bar.value)
        }));

    Plot::new(format!("{id:?}"))
        .height(CHART_HEIGHT)
        .x_axis_label(table.column.clone())
        .y_axis_label("Contagem")
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(chart);
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn first_key_is_category_rest_is_series() {
        let rows = [
            (key(&["Comércio", "Admissão", "Homem"]), 3.0),
            (key(&["Comércio", "Desligamento", "Homem"]), 1.0),
            (key(&["Indústria", "Admissão", "Homem"]), 2.0),
        ];
        let layout = CategorySeries::from_keyed(rows.iter().map(|(k, v)| (k.as_slice(), *v)));

        assert_eq!(layout.categories, vec!["Comércio", "Indústria"]);
        assert_eq!(layout.series.len(), 2);
        assert_eq!(layout.series["Admissão / Homem"][&1], 2.0);
        assert!(!layout.series["Desligamento / Homem"].contains_key(&1));
        assert_eq!(layout.stacked().len(), 2);
    }

    #[test]
    fn age_bucket_categories_keep_age_order() {
        let rows = [(key(&["<25"]), 1.0), (key(&["55+"]), 1.0), (key(&["25-34"]), 1.0)];
        let layout = CategorySeries::from_keyed(rows.iter().map(|(k, v)| (k.as_slice(), *v)));
        assert_eq!(layout.categories, vec!["<25", "25-34", "55+"]);
    }

    #[test]
    fn single_key_rows_form_a_total_series() {
        let rows = [(key(&["Reemprego"]), 4.0)];
        let layout = CategorySeries::from_keyed(rows.iter().map(|(k, v)| (k.as_slice(), *v)));
        assert_eq!(layout.series.keys().collect::<Vec<_>>(), vec!["Total"]);
    }
}
