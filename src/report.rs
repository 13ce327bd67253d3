//! Plain-text rendering of a solved plan for console or file output.

use std::fmt::Write;

use crate::planner::SolutionResult;

pub fn render(result: &SolutionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Capacity plan ({})", result.status);
    let _ = writeln!(out, "---------------------------------------------");
    for (tech, capacity) in &result.capacities_mw {
        let _ = writeln!(out, "  {tech:<12} {capacity:>12.2} MW");
    }
    let _ = writeln!(out, "---------------------------------------------");
    let _ = writeln!(out, "  expected cost   {:>14.2}", result.expected_cost);
    let _ = writeln!(out, "  value at risk   {:>14.2}", result.value_at_risk);
    let _ = writeln!(out, "  CVaR            {:>14.2}", result.cvar);
    let _ = writeln!(out, "  worst case      {:>14.2}", result.worst_case_cost);
    let _ = writeln!(out, "  objective       {:>14.2}", result.objective_value);
    let _ = writeln!(out, "  scenario costs:");
    for (s, cost) in result.scenario_costs.iter().enumerate() {
        let shed_total: f64 = result.shed_mw[s].iter().sum();
        let _ = writeln!(out, "    s{s:<3} cost {cost:>14.2}  shed {shed_total:>10.2} MW");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolveStatus;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    #[test]
    fn renders_capacities_and_risk_figures() {
        let result = SolutionResult {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            status: SolveStatus::Optimal,
            capacities_mw: BTreeMap::from([
                ("solar".to_string(), 120.5),
                ("wind".to_string(), 80.0),
            ]),
            dispatch_mw: BTreeMap::new(),
            shed_mw: vec![vec![0.0, 0.0], vec![1.5, 0.0]],
            scenario_costs: vec![100.0, 1600.0],
            expected_cost: 850.0,
            value_at_risk: 1600.0,
            cvar: 1600.0,
            worst_case_cost: 1600.0,
            objective_value: 12_345.0,
        };

        let text = render(&result);
        assert!(text.contains("solar"));
        assert!(text.contains("120.50"));
        assert!(text.contains("CVaR"));
        assert!(text.contains("s1"));
    }
}
