pub mod chart_view;
pub mod dashboard;
