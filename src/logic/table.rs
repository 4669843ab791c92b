use crate::models::{ForecastDay, ForecastSeries};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Date,
    RainRisk,
    TempExtreme,
    SoilMoisture,
    Confidence,
}

impl SortColumn {
    pub const ALL: [SortColumn; 5] = [
        SortColumn::Date,
        SortColumn::RainRisk,
        SortColumn::TempExtreme,
        SortColumn::SoilMoisture,
        SortColumn::Confidence,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SortColumn::Date => "Date",
            SortColumn::RainRisk => "Rain",
            SortColumn::TempExtreme => "Temp",
            SortColumn::SoilMoisture => "Moisture",
            SortColumn::Confidence => "Conf",
        }
    }

    fn compare(&self, a: &ForecastDay, b: &ForecastDay) -> Ordering {
        match self {
            SortColumn::Date => a.date.cmp(&b.date),
            SortColumn::RainRisk => a.rain_risk.total_cmp(&b.rain_risk),
            SortColumn::TempExtreme => a.temp_extreme.total_cmp(&b.temp_extreme),
            SortColumn::SoilMoisture => a.soil_moisture_proxy.total_cmp(&b.soil_moisture_proxy),
            SortColumn::Confidence => a.confidence_score.total_cmp(&b.confidence_score),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flip(&self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

/// Presentation state for the forecast table. Holds row order, expansion
/// and selection; the series itself is never touched.
#[derive(Debug, Clone)]
pub struct MetricsTableView {
    order: Vec<usize>,
    expanded: BTreeSet<NaiveDate>,
    sort: Option<(SortColumn, SortDirection)>,
    selected: usize,
}

impl MetricsTableView {
    pub fn new(len: usize) -> Self {
        Self {
            order: (0..len).collect(),
            expanded: BTreeSet::new(),
            sort: None,
            selected: 0,
        }
    }

    /// Back to chronological order for a freshly loaded series
    pub fn reset(&mut self, len: usize) {
        *self = Self::new(len);
    }

    /// Stable sort of the current row order, so ties keep their prior
    /// relative position.
    pub fn sort(&mut self, series: &ForecastSeries, column: SortColumn, direction: SortDirection) {
        if self.order.len() != series.len() {
            self.reset(series.len());
        }
        let days = series.days();
        self.order.sort_by(|&a, &b| {
            let ord = column.compare(&days[a], &days[b]);
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        self.sort = Some((column, direction));
    }

    /// Same column flips direction; a new column starts ascending.
    pub fn toggle_sort(&mut self, series: &ForecastSeries, column: SortColumn) {
        let direction = match self.sort {
            Some((current, dir)) if current == column => dir.flip(),
            _ => SortDirection::Ascending,
        };
        self.sort(series, column, direction);
    }

    pub fn sort_state(&self) -> Option<(SortColumn, SortDirection)> {
        self.sort
    }

    /// Returns the new expansion state of the row
    pub fn toggle_expand(&mut self, date: NaiveDate) -> bool {
        if self.expanded.remove(&date) {
            false
        } else {
            self.expanded.insert(date);
            true
        }
    }

    pub fn is_expanded(&self, date: NaiveDate) -> bool {
        self.expanded.contains(&date)
    }

    /// Days in display order
    pub fn rows<'a>(&self, series: &'a ForecastSeries) -> Vec<&'a ForecastDay> {
        self.order.iter().filter_map(|&i| series.day(i)).collect()
    }

    /// Position in display order
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Series index of the selected row
    pub fn selected_index(&self) -> Option<usize> {
        self.order.get(self.selected).copied()
    }

    /// Move the cursor onto the row showing `index` of the series
    pub fn select_index(&mut self, index: usize) {
        if let Some(pos) = self.order.iter().position(|&i| i == index) {
            self.selected = pos;
        }
    }

    pub fn select_next(&mut self) {
        if !self.order.is_empty() {
            self.selected = (self.selected + 1).min(self.order.len() - 1);
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::forecast::fixtures::*;

    fn dates(view: &MetricsTableView, series: &ForecastSeries) -> Vec<NaiveDate> {
        view.rows(series).iter().map(|d| d.date).collect()
    }

    #[test]
    fn date_sort_round_trip_restores_order() {
        let series = ten_day_series();
        let original: Vec<_> = series.days().iter().map(|d| d.date).collect();
        let mut view = MetricsTableView::new(series.len());

        view.sort(&series, SortColumn::Date, SortDirection::Ascending);
        view.sort(&series, SortColumn::Date, SortDirection::Descending);
        view.sort(&series, SortColumn::Date, SortDirection::Ascending);
        view.sort(&series, SortColumn::Date, SortDirection::Descending);
        view.sort(&series, SortColumn::Date, SortDirection::Ascending);
        assert_eq!(dates(&view, &series), original);
    }

    #[test]
    fn ties_preserve_prior_order() {
        let series = series(vec![
            day(0, 50.0, 10.0, 50.0, 0.9),
            day(1, 20.0, 10.0, 50.0, 0.9),
            day(2, 50.0, 10.0, 50.0, 0.9),
            day(3, 20.0, 10.0, 50.0, 0.9),
        ]);
        let mut view = MetricsTableView::new(series.len());
        view.sort(&series, SortColumn::Date, SortDirection::Descending);
        view.sort(&series, SortColumn::RainRisk, SortDirection::Ascending);
        assert_eq!(
            dates(&view, &series),
            vec![date(3), date(1), date(2), date(0)]
        );
    }

    #[test]
    fn toggle_sort_flips_then_resets() {
        let series = ten_day_series();
        let mut view = MetricsTableView::new(series.len());

        view.toggle_sort(&series, SortColumn::RainRisk);
        assert_eq!(
            view.sort_state(),
            Some((SortColumn::RainRisk, SortDirection::Ascending))
        );
        view.toggle_sort(&series, SortColumn::RainRisk);
        assert_eq!(
            view.sort_state(),
            Some((SortColumn::RainRisk, SortDirection::Descending))
        );
        view.toggle_sort(&series, SortColumn::Confidence);
        assert_eq!(
            view.sort_state(),
            Some((SortColumn::Confidence, SortDirection::Ascending))
        );

        let conf: Vec<f64> = view
            .rows(&series)
            .iter()
            .map(|d| d.confidence_score)
            .collect();
        assert!(conf.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn expand_toggles_without_touching_data() {
        let series = ten_day_series();
        let before = series.clone();
        let mut view = MetricsTableView::new(series.len());

        assert!(view.toggle_expand(date(2)));
        assert!(view.is_expanded(date(2)));
        assert!(!view.is_expanded(date(3)));
        assert!(!view.toggle_expand(date(2)));
        assert!(!view.is_expanded(date(2)));
        assert_eq!(series, before);
    }

    #[test]
    fn selection_follows_series_index() {
        let series = ten_day_series();
        let mut view = MetricsTableView::new(series.len());
        view.sort(&series, SortColumn::Date, SortDirection::Descending);

        view.select_index(9);
        assert_eq!(view.selected(), 0);
        assert_eq!(view.selected_index(), Some(9));

        view.select_previous();
        assert_eq!(view.selected(), 0);
        for _ in 0..20 {
            view.select_next();
        }
        assert_eq!(view.selected_index(), Some(0));
    }
}
