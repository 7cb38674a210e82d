use super::{PageSizeRequest, PageSizeStrategy, StrategyType};
use crate::error::{RecastError, RecastResult};

/// Uses the nominal page size as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStrategy;

impl PageSizeStrategy for DefaultStrategy {
    fn strategy_type(&self) -> StrategyType {
        StrategyType::Default
    }

    fn calculate_page_size(&self, request: &PageSizeRequest<'_>) -> RecastResult<usize> {
        request.require_pool()?;
        if request.page_size == 0 {
            return Err(RecastError::invalid_argument(
                "page size must be greater than 0",
            ));
        }
        Ok(request.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::KnownSample;

    #[test]
    fn test_pass_through() {
        let sample = KnownSample { len: 7, average: 512 };
        let request = PageSizeRequest::new(100, 4, 10, &sample);
        assert_eq!(DefaultStrategy.calculate_page_size(&request).unwrap(), 100);

        // other inputs do not matter
        let request = PageSizeRequest::new(100, 64, 1, &sample);
        assert_eq!(DefaultStrategy.calculate_page_size(&request).unwrap(), 100);
    }

    #[test]
    fn test_rejects_zero_page_size() {
        let sample = KnownSample { len: 1, average: 1 };
        let request = PageSizeRequest::new(0, 4, 10, &sample);
        assert!(DefaultStrategy.calculate_page_size(&request).is_err());
    }
}
