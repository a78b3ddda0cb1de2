use crate::models::itinerary::DailyItinerary;

pub struct PricingService;

impl PricingService {
    /// Total cost of a trip for the whole group, summed over its day rows.
    ///
    /// Cost fields on the loose records are either per-person or
    /// group-level: activity `cost_estimate` and attraction `entrance_fee`
    /// are per person, food prefers `total_cost_for_group` and falls back to
    /// `cost_per_person`. Absent fields contribute nothing.
    pub fn trip_group_cost(days: &[DailyItinerary], party_size: u32) -> f64 {
        let party = party_size.max(1) as f64;
        let mut total = 0.0;

        for day in days {
            for activity in &day.activities {
                if let Some(cost) = activity.cost_estimate {
                    total += cost * party;
                }
            }

            for attraction in &day.attractions {
                if let Some(fee) = attraction.entrance_fee {
                    total += fee * party;
                }
            }

            for food in &day.food_recommendations {
                if let Some(group_cost) = food.total_cost_for_group {
                    total += group_cost;
                } else if let Some(per_person) = food.cost_per_person {
                    total += per_person * party;
                }
            }
        }

        total
    }

    pub fn trip_person_cost(days: &[DailyItinerary], party_size: u32) -> f64 {
        Self::trip_group_cost(days, party_size) / party_size.max(1) as f64
    }
}
